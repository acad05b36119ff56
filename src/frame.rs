// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 张量帧定义
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

//! 一次推理输出的九个张量（三个尺度 × 分类/回归/关键点）。
//!
//! 所有张量均为通道优先布局：第 `c` 个通道、第 `cell` 个网格的值位于
//! `c * cells + cell`。每个网格有两个锚框，通道按锚框分组排列。

use std::fmt;

use thiserror::Error;

pub const SCALE_NUM: usize = 3;
pub const ANCHORS_PER_CELL: usize = 2;
pub const LOC_SIZE: usize = 4;
pub const CONF_SIZE: usize = 2;
pub const LANDMARK_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
  Conf,
  Loc,
  Landms,
}

impl TensorKind {
  pub const ALL: [TensorKind; 3] = [TensorKind::Conf, TensorKind::Loc, TensorKind::Landms];

  /// 每个网格的通道数
  pub fn channels(self) -> usize {
    let per_anchor = match self {
      TensorKind::Conf => CONF_SIZE,
      TensorKind::Loc => LOC_SIZE,
      TensorKind::Landms => LANDMARK_SIZE,
    };
    per_anchor * ANCHORS_PER_CELL
  }
}

impl fmt::Display for TensorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TensorKind::Conf => "conf",
      TensorKind::Loc => "loc",
      TensorKind::Landms => "landms",
    };
    f.write_str(name)
  }
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("张量长度不匹配: 尺度 {scale} 的 {kind} 期望 {expected}, 实际 {actual}")]
  ShapeMismatch {
    scale: usize,
    kind: TensorKind,
    expected: usize,
    actual: usize,
  },
  #[error("无法识别的张量, 元素数量 {0}")]
  UnknownTensor(usize),
  #[error("重复的张量: 尺度 {scale} 的 {kind}")]
  DuplicateTensor { scale: usize, kind: TensorKind },
  #[error("缺少张量: 尺度 {scale} 的 {kind}")]
  MissingTensor { scale: usize, kind: TensorKind },
}

#[derive(Debug, Clone)]
pub struct ScaleTensors {
  cells: usize,
  conf: Box<[f32]>,
  loc: Box<[f32]>,
  landms: Box<[f32]>,
}

impl ScaleTensors {
  pub fn new(
    scale: usize,
    cells: usize,
    conf: Vec<f32>,
    loc: Vec<f32>,
    landms: Vec<f32>,
  ) -> Result<Self, FrameError> {
    for (kind, len) in [
      (TensorKind::Conf, conf.len()),
      (TensorKind::Loc, loc.len()),
      (TensorKind::Landms, landms.len()),
    ] {
      let expected = kind.channels() * cells;
      if len != expected {
        return Err(FrameError::ShapeMismatch {
          scale,
          kind,
          expected,
          actual: len,
        });
      }
    }

    Ok(Self {
      cells,
      conf: conf.into_boxed_slice(),
      loc: loc.into_boxed_slice(),
      landms: landms.into_boxed_slice(),
    })
  }

  pub fn zeros(cells: usize) -> Self {
    Self {
      cells,
      conf: vec![0.0; TensorKind::Conf.channels() * cells].into_boxed_slice(),
      loc: vec![0.0; TensorKind::Loc.channels() * cells].into_boxed_slice(),
      landms: vec![0.0; TensorKind::Landms.channels() * cells].into_boxed_slice(),
    }
  }

  pub fn cells(&self) -> usize {
    self.cells
  }

  pub fn conf(&self) -> &[f32] {
    &self.conf
  }

  pub fn loc(&self) -> &[f32] {
    &self.loc
  }

  pub fn landms(&self) -> &[f32] {
    &self.landms
  }

  /// 写入某个锚框的背景/人脸 logit
  pub fn set_conf(&mut self, cell: usize, anchor: usize, background: f32, face: f32) {
    let base = anchor * CONF_SIZE;
    self.conf[base * self.cells + cell] = background;
    self.conf[(base + 1) * self.cells + cell] = face;
  }

  pub fn set_loc(&mut self, cell: usize, anchor: usize, regression: [f32; LOC_SIZE]) {
    for (k, value) in regression.into_iter().enumerate() {
      self.loc[(anchor * LOC_SIZE + k) * self.cells + cell] = value;
    }
  }

  pub fn set_landms(&mut self, cell: usize, anchor: usize, landmarks: [f32; LANDMARK_SIZE]) {
    for (k, value) in landmarks.into_iter().enumerate() {
      self.landms[(anchor * LANDMARK_SIZE + k) * self.cells + cell] = value;
    }
  }
}

#[derive(Debug, Clone)]
pub struct TensorFrame {
  scales: [ScaleTensors; SCALE_NUM],
}

impl TensorFrame {
  pub fn new(scales: [ScaleTensors; SCALE_NUM]) -> Self {
    Self { scales }
  }

  pub fn zeros(cells: [usize; SCALE_NUM]) -> Self {
    Self {
      scales: cells.map(ScaleTensors::zeros),
    }
  }

  /// 按元素数量识别乱序的九个输出张量。
  ///
  /// 同一尺度下三类张量的通道数不同，且各尺度的网格数不同，
  /// 因此长度足以唯一确定张量的身份，与文件名和输出顺序无关。
  pub fn from_unordered(
    tensors: Vec<Vec<f32>>,
    cells: [usize; SCALE_NUM],
  ) -> Result<Self, FrameError> {
    let mut slots: [[Option<Vec<f32>>; 3]; SCALE_NUM] = Default::default();

    for tensor in tensors {
      let len = tensor.len();
      let position = cells.iter().enumerate().find_map(|(scale, &n)| {
        TensorKind::ALL
          .iter()
          .position(|kind| kind.channels() * n == len)
          .map(|kind| (scale, kind))
      });

      let Some((scale, kind)) = position else {
        return Err(FrameError::UnknownTensor(len));
      };
      if slots[scale][kind].is_some() {
        return Err(FrameError::DuplicateTensor {
          scale,
          kind: TensorKind::ALL[kind],
        });
      }
      slots[scale][kind] = Some(tensor);
    }

    let build = |scale: usize,
                 [conf, loc, landms]: [Option<Vec<f32>>; 3]|
     -> Result<ScaleTensors, FrameError> {
      let missing = |kind: TensorKind| FrameError::MissingTensor { scale, kind };
      ScaleTensors::new(
        scale,
        cells[scale],
        conf.ok_or_else(|| missing(TensorKind::Conf))?,
        loc.ok_or_else(|| missing(TensorKind::Loc))?,
        landms.ok_or_else(|| missing(TensorKind::Landms))?,
      )
    };

    let [s0, s1, s2] = slots;
    Ok(Self {
      scales: [build(0, s0)?, build(1, s1)?, build(2, s2)?],
    })
  }

  pub fn scales(&self) -> &[ScaleTensors; SCALE_NUM] {
    &self.scales
  }

  pub fn scale_mut(&mut self, scale: usize) -> &mut ScaleTensors {
    &mut self.scales[scale]
  }

  pub fn cells(&self) -> [usize; SCALE_NUM] {
    [
      self.scales[0].cells(),
      self.scales[1].cells(),
      self.scales[2].cells(),
    ]
  }
}
