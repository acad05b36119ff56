// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::FrameReport,
  output::{
    Render,
    osd::{OsdCommand, OsdOverlay},
  },
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数 {key} 的值无效: {value}")]
  InvalidParameter { key: String, value: String },
}

/// 把检测结果、ROI 窗口和显示层命令写入日志
pub struct LogOutput {
  overlay: Mutex<OsdOverlay>,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(format!(
        "期望输出方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut model_size = (1280, 720);
    let mut display_size = (1920, 1080);
    for (key, value) in url.query_pairs() {
      let slot = match key.as_ref() {
        "input_width" => &mut model_size.0,
        "input_height" => &mut model_size.1,
        "display_width" => &mut display_size.0,
        "display_height" => &mut display_size.1,
        _ => {
          warn!("忽略未知的输出参数: {}={}", key, value);
          continue;
        }
      };
      *slot = value
        .parse()
        .map_err(|_| LogOutputError::InvalidParameter {
          key: key.to_string(),
          value: value.to_string(),
        })?;
    }

    Ok(LogOutput::new(model_size, display_size))
  }
}

impl LogOutput {
  pub fn new(model_size: (u32, u32), display_size: (u32, u32)) -> Self {
    Self {
      overlay: Mutex::new(OsdOverlay::new(model_size, display_size)),
    }
  }

  fn log_commands(commands: &[OsdCommand]) {
    for command in commands {
      debug!("{}", command);
    }
  }
}

impl Render<TensorFrame, FrameReport> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, _frame: &TensorFrame, report: &FrameReport) -> Result<(), Self::Error> {
    let result = &report.result;
    info!("检测到 {} 个人脸", result.len());
    for (i, item) in result.items.iter().enumerate() {
      let bbox = &item.bbox;
      info!(
        "人脸 {}: 置信度 {:.3}, 框 ({}, {}) - ({}, {}), 关键点 {:?}",
        i + 1,
        item.score,
        bbox.x1,
        bbox.y1,
        bbox.x2,
        bbox.y2,
        item.landmarks.points
      );
    }

    if let Some(roi) = &report.ae_roi {
      info!("AE ROI 窗口 {} 个", roi.len());
      for window in roi.windows() {
        info!(
          "ROI 窗口: 偏移 ({}, {}), 尺寸 {}x{}, 权重 {:.3}",
          window.h_offset, window.v_offset, window.width, window.height, window.weight
        );
      }
    }

    let commands = self
      .overlay
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .update(result);
    Self::log_commands(&commands);
    Ok(())
  }

  fn finish(&self) -> Result<(), Self::Error> {
    let commands = self
      .overlay
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .finish();
    Self::log_commands(&commands);
    Ok(())
  }
}
