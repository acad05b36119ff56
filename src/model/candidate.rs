// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/candidate.rs - 候选锚框筛选与回归值收集
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

use crate::frame::{ANCHORS_PER_CELL, CONF_SIZE, LANDMARK_SIZE, LOC_SIZE, TensorFrame};

/// 通过阈值的锚框及其回归值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub anchor_index: usize,
  pub probability: f32,
  pub regression: [f32; LOC_SIZE],
  pub landmarks: [f32; LANDMARK_SIZE],
}

impl Candidate {
  fn new(anchor_index: usize, probability: f32) -> Self {
    Self {
      anchor_index,
      probability,
      regression: [0.0; LOC_SIZE],
      landmarks: [0.0; LANDMARK_SIZE],
    }
  }
}

/// 背景/人脸两类 softmax 中人脸的概率（减去最大值以避免溢出）
#[inline]
pub fn face_probability(background: f32, face: f32) -> f32 {
  let max = background.max(face);
  let bg = (background - max).exp();
  let fg = (face - max).exp();
  fg / (bg + fg)
}

/// 按固定扫描顺序（尺度 0→2，网格递增，每格两个锚框）筛选人脸概率
/// 不低于 `obj_threshold` 的锚框。结果按锚框索引递增排列。
pub fn extract_candidates(frame: &TensorFrame, obj_threshold: f32, candidates: &mut Vec<Candidate>) {
  candidates.clear();
  let mut anchor_index = 0usize;

  for scale in frame.scales() {
    let cells = scale.cells();
    let conf = scale.conf();
    debug_assert_eq!(conf.len(), CONF_SIZE * ANCHORS_PER_CELL * cells);

    let (bg0, rest) = conf.split_at(cells);
    let (face0, rest) = rest.split_at(cells);
    let (bg1, face1) = rest.split_at(cells);

    for cell in 0..cells {
      for (background, face) in [(bg0[cell], face0[cell]), (bg1[cell], face1[cell])] {
        let probability = face_probability(background, face);
        if probability >= obj_threshold {
          candidates.push(Candidate::new(anchor_index, probability));
        }
        anchor_index += 1;
      }
    }
  }
}

/// 以与 [`extract_candidates`] 相同的顺序遍历回归和关键点张量，
/// 扫描位置与下一个候选的锚框索引相同时拷贝其 4 个回归值与 10 个关键点值。
///
/// 单趟归并，复杂度为锚框总数而非锚框数乘候选数。
pub fn gather_regressions(frame: &TensorFrame, candidates: &mut [Candidate]) {
  let mut pending = candidates.iter_mut().peekable();
  let mut anchor_index = 0usize;

  for scale in frame.scales() {
    let cells = scale.cells();
    let loc = scale.loc();
    let landms = scale.landms();
    debug_assert_eq!(loc.len(), LOC_SIZE * ANCHORS_PER_CELL * cells);
    debug_assert_eq!(landms.len(), LANDMARK_SIZE * ANCHORS_PER_CELL * cells);

    for cell in 0..cells {
      if pending.peek().is_none() {
        return;
      }
      for anchor in 0..ANCHORS_PER_CELL {
        if let Some(candidate) = pending.next_if(|c| c.anchor_index == anchor_index) {
          for (k, value) in candidate.regression.iter_mut().enumerate() {
            *value = loc[(anchor * LOC_SIZE + k) * cells + cell];
          }
          for (k, value) in candidate.landmarks.iter_mut().enumerate() {
            *value = landms[(anchor * LANDMARK_SIZE + k) * cells + cell];
          }
        }
        anchor_index += 1;
      }
    }
  }
}
