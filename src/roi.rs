// 该文件是 Shanan （山南西风） 项目的一部分。
// src/roi.rs - 由人脸框生成自动曝光 ROI 权重
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

//! 人脸框从模型输入坐标映射到传感器坐标，按面积分配曝光权重。

use serde::Serialize;
use tracing::debug;

use crate::model::FaceCoordinate;

/// ISP 同时支持的 ROI 窗口上限
pub const AE_ROI_MAX_WINDOWS: usize = 8;

/// 传感器坐标下的一个曝光窗口
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AeRoiWindow {
  pub h_offset: u32,
  pub v_offset: u32,
  pub width: u32,
  pub height: u32,
  pub weight: f32,
}

impl AeRoiWindow {
  pub fn area(&self) -> u64 {
    u64::from(self.width) * u64::from(self.height)
  }
}

/// 一帧的 ROI 更新；窗口数为 0 表示清空 ROI
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AeRoi {
  windows: Vec<AeRoiWindow>,
}

impl AeRoi {
  pub fn windows(&self) -> &[AeRoiWindow] {
    &self.windows
  }

  pub fn len(&self) -> usize {
    self.windows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.windows.is_empty()
  }

  pub fn total_weight(&self) -> f32 {
    self.windows.iter().map(|w| w.weight).sum()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeRoiConfig {
  pub model_width: u32,
  pub model_height: u32,
  pub sensor_width: u32,
  pub sensor_height: u32,
  /// 传感器坐标下的附加偏移
  pub offset_h: u32,
  pub offset_v: u32,
  pub enabled: bool,
}

impl Default for AeRoiConfig {
  fn default() -> Self {
    Self {
      model_width: 1280,
      model_height: 720,
      sensor_width: 1920,
      sensor_height: 1080,
      offset_h: 0,
      offset_v: 0,
      enabled: true,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AeRoiBuilder {
  config: AeRoiConfig,
}

/// 一个轴上的映射：返回 (偏移, 长度)，整数运算，偏移加长度不越过传感器边界。
/// 偏移落在传感器之外时返回 `None`。
#[inline]
fn map_axis(start: i32, end: i32, model: u32, sensor: u32, extra_offset: u32) -> Option<(u32, u32)> {
  let model = u64::from(model.max(1));
  let sensor = u64::from(sensor);
  let start = u64::from(start.max(0).unsigned_abs());
  let end = u64::from(end.max(0).unsigned_abs());

  let offset = start * sensor / model + u64::from(extra_offset);
  if offset >= sensor {
    return None;
  }
  let size = (end.saturating_sub(start) * sensor / model).min(sensor - offset);

  Some((u32::try_from(offset).ok()?, u32::try_from(size).ok()?))
}

impl AeRoiBuilder {
  pub fn new(config: AeRoiConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &AeRoiConfig {
    &self.config
  }

  pub fn is_enabled(&self) -> bool {
    self.config.enabled
  }

  /// 只取前 [`AE_ROI_MAX_WINDOWS`] 个框，落在传感器之外的窗口被丢弃。
  /// 所有窗口面积均为 0 时平均分配权重。
  pub fn build<'a, I>(&self, boxes: I) -> AeRoi
  where
    I: IntoIterator<Item = &'a FaceCoordinate>,
  {
    let cfg = &self.config;
    let mut windows: Vec<AeRoiWindow> = boxes
      .into_iter()
      .take(AE_ROI_MAX_WINDOWS)
      .filter_map(|bbox| {
        let horizontal = map_axis(
          bbox.x1,
          bbox.x2,
          cfg.model_width,
          cfg.sensor_width,
          cfg.offset_h,
        );
        let vertical = map_axis(
          bbox.y1,
          bbox.y2,
          cfg.model_height,
          cfg.sensor_height,
          cfg.offset_v,
        );
        let (Some((h_offset, width)), Some((v_offset, height))) = (horizontal, vertical) else {
          debug!("人脸框 {:?} 映射后超出传感器范围, 丢弃", bbox);
          return None;
        };
        Some(AeRoiWindow {
          h_offset,
          v_offset,
          width,
          height,
          weight: 0.0,
        })
      })
      .collect();

    let sum: u64 = windows.iter().map(AeRoiWindow::area).sum();
    let count = windows.len();
    for window in &mut windows {
      window.weight = if sum == 0 {
        1.0 / count as f32
      } else {
        (window.area() as f64 / sum as f64) as f32
      };
    }

    AeRoi { windows }
  }
}
