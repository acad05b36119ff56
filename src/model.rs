// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

use serde::Serialize;

use crate::roi::AeRoi;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 输入帧像素坐标下的人脸框
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FaceCoordinate {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl FaceCoordinate {
  pub fn width(&self) -> i32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> i32 {
    self.y2 - self.y1
  }
}

/// 五点关键点（左眼、右眼、鼻尖、左嘴角、右嘴角），像素坐标，不做裁剪
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FaceLandmarks {
  pub points: [[i32; 2]; 5],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectItem {
  pub score: f32,
  pub bbox: FaceCoordinate,
  pub landmarks: FaceLandmarks,
}

/// 单帧检测结果，按置信度降序排列
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn boxes(&self) -> impl ExactSizeIterator<Item = &FaceCoordinate> {
    self.items.iter().map(|item| &item.bbox)
  }

  pub fn landmarks(&self) -> impl ExactSizeIterator<Item = &FaceLandmarks> {
    self.items.iter().map(|item| &item.landmarks)
  }
}

/// 每帧交给下游的全部结果：检测结果与由其生成的 AE ROI
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
  pub result: DetectResult,
  /// AE ROI 关闭时为 `None`
  pub ae_roi: Option<AeRoi>,
}

pub mod anchors;
pub mod candidate;
pub mod decode;
pub mod nms;
pub mod remap;
pub mod retinaface;

pub use self::retinaface::{DetectConfig, RetinaFace, RetinaFaceBuilder, RetinaFaceError, detect};
