// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/remap.rs - 去除 letterbox 填充，映射回输入帧像素坐标
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

use crate::model::{
  FaceCoordinate, FaceLandmarks,
  decode::{DecodedBox, DecodedLandmarks},
};

/// 预处理时短边两侧对称填充成正方形，这里做逆变换。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
  width: i32,
  height: i32,
  long_side: i32,
  pad: i32,
  /// 高为长边时填充在宽度方向
  width_pad: bool,
}

impl Letterbox {
  pub fn new(width: u32, height: u32) -> Self {
    let width = i32::try_from(width).unwrap_or(i32::MAX);
    let height = i32::try_from(height).unwrap_or(i32::MAX);
    let long_side = width.max(height);
    let short_side = width.min(height);
    Self {
      width,
      height,
      long_side,
      pad: (long_side - short_side) / 2,
      width_pad: long_side == height,
    }
  }

  pub fn pad(&self) -> i32 {
    self.pad
  }

  #[inline]
  fn scale(&self, v: f32) -> i32 {
    (v * self.long_side as f32) as i32
  }

  #[inline]
  fn pad_xy(&self) -> (i32, i32) {
    if self.width_pad {
      (self.pad, 0)
    } else {
      (0, self.pad)
    }
  }

  /// 输出保证 1 <= x1 <= x2 <= W，1 <= y1 <= y2 <= H（W、H 不小于 1 时）
  pub fn map_box(&self, bbox: &DecodedBox) -> FaceCoordinate {
    let long_side = self.long_side as f32;
    let (pad_x, pad_y) = self.pad_xy();
    let half_w = bbox.w * long_side / 2.0;
    let half_h = bbox.h * long_side / 2.0;

    let x1 = ((bbox.cx * long_side - half_w) as i32).saturating_sub(pad_x);
    let y1 = ((bbox.cy * long_side - half_h) as i32).saturating_sub(pad_y);
    let x2 = ((bbox.cx * long_side + half_w) as i32).saturating_sub(pad_x);
    let y2 = ((bbox.cy * long_side + half_h) as i32).saturating_sub(pad_y);

    let x1 = x1.max(1).min(self.width);
    let y1 = y1.max(1).min(self.height);
    FaceCoordinate {
      x1,
      y1,
      x2: x2.min(self.width).max(x1),
      y2: y2.min(self.height).max(y1),
    }
  }

  /// 关键点只做缩放和去填充，不裁剪
  pub fn map_landmarks(&self, landmarks: &DecodedLandmarks) -> FaceLandmarks {
    let (pad_x, pad_y) = self.pad_xy();
    FaceLandmarks {
      points: landmarks
        .points
        .map(|[x, y]| [self.scale(x).saturating_sub(pad_x), self.scale(y).saturating_sub(pad_y)]),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn decoded(cx: f32, cy: f32, w: f32, h: f32) -> DecodedBox {
    DecodedBox { cx, cy, w, h }
  }

  #[test]
  fn test_landscape_pads_height() {
    let letterbox = Letterbox::new(1280, 720);
    assert_eq!(letterbox.pad(), 280);

    // 中心 640，半宽 128；纵向 640 - 280
    let bbox = letterbox.map_box(&decoded(0.5, 0.5, 0.2, 0.2));
    assert_eq!(
      bbox,
      FaceCoordinate {
        x1: 512,
        y1: 232,
        x2: 768,
        y2: 488
      }
    );
  }

  #[test]
  fn test_portrait_pads_width() {
    let letterbox = Letterbox::new(720, 1280);
    let bbox = letterbox.map_box(&decoded(0.5, 0.25, 0.125, 0.125));
    assert_eq!(
      bbox,
      FaceCoordinate {
        x1: 280,
        y1: 240,
        x2: 440,
        y2: 400
      }
    );
  }

  #[test]
  fn test_clamps_to_frame() {
    let letterbox = Letterbox::new(1280, 720);
    // 跨过左上角和右下角
    let bbox = letterbox.map_box(&decoded(0.5, 0.5, 1.5, 1.5));
    assert_eq!(
      bbox,
      FaceCoordinate {
        x1: 1,
        y1: 1,
        x2: 1280,
        y2: 720
      }
    );

    // x1 恰好为 0 时也提升到 1
    let bbox = letterbox.map_box(&decoded(0.125, 0.5, 0.25, 0.25));
    assert_eq!(bbox.x1, 1);
    assert_eq!(bbox.x2, 320);
  }

  #[test]
  fn test_box_outside_frame_stays_ordered() {
    let letterbox = Letterbox::new(1280, 720);
    // 全部落在上方填充区域
    let bbox = letterbox.map_box(&decoded(0.5, 0.0625, 0.125, 0.0625));
    assert!(bbox.x1 <= bbox.x2);
    assert_eq!((bbox.y1, bbox.y2), (1, 1));

    // 全部落在右侧帧外
    let bbox = letterbox.map_box(&decoded(1.5, 0.5, 0.125, 0.125));
    assert_eq!((bbox.x1, bbox.x2), (1280, 1280));
  }

  #[test]
  fn test_landmarks_are_not_clamped() {
    let letterbox = Letterbox::new(1280, 720);
    let landmarks = letterbox.map_landmarks(&DecodedLandmarks {
      points: [
        [0.5, 0.5],
        [0.0, 0.0],
        [1.0, 1.0],
        [0.25, 0.75],
        [-0.5, 1.5],
      ],
    });
    assert_eq!(
      landmarks.points,
      [[640, 360], [0, -280], [1280, 1000], [320, 680], [-640, 1640]]
    );
  }

  #[test]
  fn test_square_input_has_no_pad() {
    let letterbox = Letterbox::new(320, 320);
    assert_eq!(letterbox.pad(), 0);
    let bbox = letterbox.map_box(&decoded(0.5, 0.5, 0.5, 0.5));
    assert_eq!(
      bbox,
      FaceCoordinate {
        x1: 80,
        y1: 80,
        x2: 240,
        y2: 240
      }
    );
  }
}
