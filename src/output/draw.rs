// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 人脸检测结果可视化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_hollow_rect_mut},
  rect::Rect,
};

use crate::model::{DetectResult, FaceCoordinate, FaceLandmarks};

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: i32 = 2;
const LANDMARK_RADIUS: i32 = 3;
// 左眼、右眼、鼻尖、左嘴角、右嘴角
const LANDMARK_COLORS: [[u8; 3]; 5] = [
  [255, 0, 0],
  [0, 0, 255],
  [255, 255, 0],
  [255, 0, 255],
  [0, 255, 255],
];

pub struct Draw {
  box_color: [u8; 3],
  box_thickness: i32,
  landmark_radius: i32,
  landmark_colors: [[u8; 3]; 5],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      box_color: BOX_COLOR,
      box_thickness: BOX_THICKNESS,
      landmark_radius: LANDMARK_RADIUS,
      landmark_colors: LANDMARK_COLORS,
    }
  }
}

impl Draw {
  // 边框向内加粗，退化的框不画
  fn draw_box(&self, image: &mut RgbImage, bbox: &FaceCoordinate) {
    for t in 0..self.box_thickness {
      let width = bbox.width() - 2 * t;
      let height = bbox.height() - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(bbox.x1 + t, bbox.y1 + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }
  }

  fn draw_landmarks(&self, image: &mut RgbImage, landmarks: &FaceLandmarks) {
    for (point, color) in landmarks.points.iter().zip(self.landmark_colors) {
      draw_filled_circle_mut(image, (point[0], point[1]), self.landmark_radius, Rgb(color));
    }
  }

  /// 在图像上画出所有人脸框与关键点，超出画布的部分被裁掉
  pub fn draw_detection(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.items.iter() {
      self.draw_box(image, &item.bbox);
      self.draw_landmarks(image, &item.landmarks);
    }
  }
}
