// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/nms.rs - 贪心非极大值抑制
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

use crate::model::decode::{DecodedBox, DecodedLandmarks};

/// 解码后的候选人脸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub probability: f32,
  pub bbox: DecodedBox,
  pub landmarks: DecodedLandmarks,
}

/// 按概率降序（稳定排序，同分保持锚框顺序）逐个接受候选，
/// 并永久抑制之后与其 IoU 不低于 `nms_threshold` 的候选。
///
/// 返回值保持概率降序。
pub fn greedy_nms(detections: &[Detection], nms_threshold: f32) -> Vec<Detection> {
  let mut order: Vec<usize> = (0..detections.len()).collect();
  order.sort_by(|&a, &b| {
    detections[b]
      .probability
      .total_cmp(&detections[a].probability)
  });

  let mut suppressed = vec![false; detections.len()];
  let mut accepted = Vec::new();

  for (i, &current) in order.iter().enumerate() {
    if suppressed[current] {
      continue;
    }
    let best = &detections[current];
    accepted.push(*best);

    for &other in &order[i + 1..] {
      if !suppressed[other] && best.bbox.iou(&detections[other].bbox) >= nms_threshold {
        suppressed[other] = true;
      }
    }
  }

  accepted
}
