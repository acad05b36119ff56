// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/decode.rs - 锚框偏移解码
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

use crate::{
  frame::{LANDMARK_SIZE, LOC_SIZE},
  model::anchors::Anchor,
};

pub const VARIANCE_CENTER: f32 = 0.1;
pub const VARIANCE_SIZE: f32 = 0.2;

/// 中心点形式的归一化人脸框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedBox {
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
}

/// 两个区间在一个轴上的重叠长度，可能为负
#[inline]
fn overlap(c1: f32, w1: f32, c2: f32, w2: f32) -> f32 {
  let left = (c1 - w1 / 2.0).max(c2 - w2 / 2.0);
  let right = (c1 + w1 / 2.0).min(c2 + w2 / 2.0);
  right - left
}

impl DecodedBox {
  pub fn area(&self) -> f32 {
    self.w * self.h
  }

  pub fn intersection(&self, other: &Self) -> f32 {
    let w = overlap(self.cx, self.w, other.cx, other.w);
    let h = overlap(self.cy, self.h, other.cy, other.h);
    if w < 0.0 || h < 0.0 {
      return 0.0;
    }
    w * h
  }

  pub fn iou(&self, other: &Self) -> f32 {
    let intersection = self.intersection(other);
    let union = self.area() + other.area() - intersection;
    if union <= 0.0 {
      0.0
    } else {
      intersection / union
    }
  }
}

/// 归一化的五点关键点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedLandmarks {
  pub points: [[f32; 2]; 5],
}

pub fn decode_box(regression: &[f32; LOC_SIZE], anchor: &Anchor) -> DecodedBox {
  let [dx, dy, dw, dh] = *regression;
  DecodedBox {
    cx: anchor.cx + dx * VARIANCE_CENTER * anchor.w,
    cy: anchor.cy + dy * VARIANCE_CENTER * anchor.h,
    w: anchor.w * (dw * VARIANCE_SIZE).exp(),
    h: anchor.h * (dh * VARIANCE_SIZE).exp(),
  }
}

/// 关键点只做仿射变换，不取指数
pub fn decode_landmarks(landmarks: &[f32; LANDMARK_SIZE], anchor: &Anchor) -> DecodedLandmarks {
  let points = std::array::from_fn(|j| {
    [
      anchor.cx + landmarks[2 * j] * VARIANCE_CENTER * anchor.w,
      anchor.cy + landmarks[2 * j + 1] * VARIANCE_CENTER * anchor.h,
    ]
  });
  DecodedLandmarks { points }
}
