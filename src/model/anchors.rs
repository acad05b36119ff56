// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/anchors.rs - RetinaFace 先验锚框表
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

use std::{ops::Index, sync::LazyLock};

use crate::frame::{ANCHORS_PER_CELL, SCALE_NUM};

/// 归一化到模型输入的锚框 (cx, cy, w, h)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct AnchorScale {
  pub feature_w: usize,
  pub feature_h: usize,
  pub step: f32,
  pub min_sizes: [f32; ANCHORS_PER_CELL],
}

impl AnchorScale {
  pub const fn cells(&self) -> usize {
    self.feature_w * self.feature_h
  }
}

pub const RETINAFACE_INPUT_SIZE: f32 = 320.0;

pub const RETINAFACE_320_SCALES: [AnchorScale; SCALE_NUM] = [
  AnchorScale {
    feature_w: 40,
    feature_h: 40,
    step: 8.0,
    min_sizes: [16.0, 32.0],
  },
  AnchorScale {
    feature_w: 20,
    feature_h: 20,
    step: 16.0,
    min_sizes: [64.0, 128.0],
  },
  AnchorScale {
    feature_w: 10,
    feature_h: 10,
    step: 32.0,
    min_sizes: [256.0, 512.0],
  },
];

/// 320x320 输入的锚框表，共 4200 项，进程内只生成一次
pub static ANCHORS_320: LazyLock<AnchorTable> = LazyLock::new(|| {
  AnchorTable::new(
    RETINAFACE_INPUT_SIZE,
    RETINAFACE_INPUT_SIZE,
    &RETINAFACE_320_SCALES,
  )
});

#[derive(Debug, Clone)]
pub struct AnchorTable {
  anchors: Box<[Anchor]>,
  cells: [usize; SCALE_NUM],
}

impl AnchorTable {
  /// 按尺度、行、列、最小尺寸的顺序生成锚框，不做裁剪。
  /// 扁平索引 = 尺度偏移 + 2 * 网格索引 + 锚框序号
  pub fn new(image_w: f32, image_h: f32, scales: &[AnchorScale; SCALE_NUM]) -> Self {
    let total = scales.iter().map(|s| s.cells() * ANCHORS_PER_CELL).sum();
    let mut anchors = Vec::with_capacity(total);

    for scale in scales {
      for i in 0..scale.feature_h {
        for j in 0..scale.feature_w {
          let cx = (j as f32 + 0.5) * scale.step / image_w;
          let cy = (i as f32 + 0.5) * scale.step / image_h;
          for min_size in scale.min_sizes {
            anchors.push(Anchor {
              cx,
              cy,
              w: min_size / image_w,
              h: min_size / image_h,
            });
          }
        }
      }
    }

    Self {
      anchors: anchors.into_boxed_slice(),
      cells: scales.each_ref().map(|s| s.cells()),
    }
  }

  pub fn len(&self) -> usize {
    self.anchors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.anchors.is_empty()
  }

  /// 每个尺度的网格数
  pub fn cells(&self) -> [usize; SCALE_NUM] {
    self.cells
  }
}

impl Index<usize> for AnchorTable {
  type Output = Anchor;

  fn index(&self, index: usize) -> &Anchor {
    &self.anchors[index]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_anchor_count() {
    assert_eq!(ANCHORS_320.len(), 4200);
    assert_eq!(ANCHORS_320.cells(), [1600, 400, 100]);
  }

  #[test]
  fn test_first_anchors_of_each_scale() {
    let a = ANCHORS_320[0];
    assert!((a.cx - 4.0 / 320.0).abs() < 1e-6);
    assert!((a.cy - 4.0 / 320.0).abs() < 1e-6);
    assert!((a.w - 0.05).abs() < 1e-6);
    assert!((ANCHORS_320[1].w - 0.1).abs() < 1e-6);
    assert_eq!(ANCHORS_320[1].cx, a.cx);

    let b = ANCHORS_320[3200];
    assert!((b.cx - 8.0 / 320.0).abs() < 1e-6);
    assert!((b.w - 0.2).abs() < 1e-6);

    let c = ANCHORS_320[4000];
    assert!((c.cx - 0.05).abs() < 1e-6);
    assert!((c.w - 0.8).abs() < 1e-6);
    assert!((ANCHORS_320[4001].w - 1.6).abs() < 1e-6);
  }

  #[test]
  fn test_row_major_cell_order() {
    // 第 0 尺度第 1 行第 0 列
    let a = ANCHORS_320[40 * 2];
    assert!((a.cx - 4.0 / 320.0).abs() < 1e-6);
    assert!((a.cy - 12.0 / 320.0).abs() < 1e-6);
  }
}
