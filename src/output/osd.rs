// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/osd.rs - 显示层人脸框标记
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

use std::fmt;

use crate::model::{DetectResult, FaceCoordinate};

/// 显示层标记操作，`frame_num` 从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsdCommand {
  Draw {
    frame_num: u32,
    x_start: u32,
    y_start: u32,
    x_end: u32,
    y_end: u32,
  },
  Clear {
    frame_num: u32,
  },
}

impl fmt::Display for OsdCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OsdCommand::Draw {
        frame_num,
        x_start,
        y_start,
        x_end,
        y_end,
      } => write!(
        f,
        "绘制标记 #{}: ({}, {}) - ({}, {})",
        frame_num, x_start, y_start, x_end, y_end
      ),
      OsdCommand::Clear { frame_num } => write!(f, "清除标记 #{}", frame_num),
    }
  }
}

/// 跨帧记录显示层上的标记数量，生成绘制/清除命令
#[derive(Debug, Clone)]
pub struct OsdOverlay {
  model_size: (u32, u32),
  display_size: (u32, u32),
  shown: usize,
}

impl OsdOverlay {
  pub fn new(model_size: (u32, u32), display_size: (u32, u32)) -> Self {
    Self {
      model_size,
      display_size,
      // 显示层初始化时带有一个标记
      shown: 1,
    }
  }

  pub fn shown(&self) -> usize {
    self.shown
  }

  fn scale(value: i32, display: u32, model: u32) -> u32 {
    let value = u64::from(value.max(0).unsigned_abs());
    let scaled = value * u64::from(display) / u64::from(model.max(1));
    u32::try_from(scaled).unwrap_or(u32::MAX)
  }

  fn draw_command(&self, frame_num: u32, bbox: &FaceCoordinate) -> OsdCommand {
    let (model_w, model_h) = self.model_size;
    let (display_w, display_h) = self.display_size;
    OsdCommand::Draw {
      frame_num,
      x_start: Self::scale(bbox.x1, display_w, model_w),
      y_start: Self::scale(bbox.y1, display_h, model_h),
      x_end: Self::scale(bbox.x2, display_w, model_w),
      y_end: Self::scale(bbox.y2, display_h, model_h),
    }
  }

  /// 先清除上一帧多出的标记，再依次绘制本帧的人脸框
  pub fn update(&mut self, result: &DetectResult) -> Vec<OsdCommand> {
    let count = result.len();
    let mut commands: Vec<OsdCommand> = (count..self.shown)
      .map(|i| OsdCommand::Clear {
        frame_num: i as u32 + 1,
      })
      .collect();

    commands.extend(
      result
        .boxes()
        .enumerate()
        .map(|(i, bbox)| self.draw_command(i as u32 + 1, bbox)),
    );

    self.shown = count;
    commands
  }

  /// 退出时清除仍在显示的标记
  pub fn finish(&mut self) -> Vec<OsdCommand> {
    let commands = (0..self.shown)
      .map(|i| OsdCommand::Clear {
        frame_num: i as u32 + 1,
      })
      .collect();
    self.shown = 0;
    commands
  }
}
