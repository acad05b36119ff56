// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/retinaface.rs - RetinaFace 检测后处理流水线
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

use std::{str::FromStr, time::Instant};

use thiserror::Error;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{
    DetectItem, DetectResult, FrameReport, Model,
    anchors::{ANCHORS_320, AnchorTable},
    candidate::{extract_candidates, gather_regressions},
    decode::{decode_box, decode_landmarks},
    nms::{Detection, greedy_nms},
    remap::Letterbox,
  },
  roi::{AeRoiBuilder, AeRoiConfig},
};

#[derive(Error, Debug)]
pub enum RetinaFaceError {
  #[error("配置无效: {0}")]
  InvalidConfig(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("张量形状与锚框表不匹配: 尺度 {scale} 期望 {expected} 个网格, 实际 {actual}")]
  TensorShape {
    scale: usize,
    expected: usize,
    actual: usize,
  },
}

/// 检测阶段的配置，启动时确定，运行中只读
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectConfig {
  pub obj_threshold: f32,
  pub nms_threshold: f32,
  /// 检测通道（模型输入帧）的宽高
  pub input_width: u32,
  pub input_height: u32,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      obj_threshold: 0.6,
      nms_threshold: 0.5,
      input_width: 1280,
      input_height: 720,
    }
  }
}

/// 基于 320x320 锚框表的检测
pub fn detect(frame: &TensorFrame, config: &DetectConfig) -> DetectResult {
  detect_with_anchors(frame, &ANCHORS_320, config)
}

/// 候选筛选 → 回归值收集 → 解码 → NMS → 坐标映射
pub fn detect_with_anchors(
  frame: &TensorFrame,
  anchors: &AnchorTable,
  config: &DetectConfig,
) -> DetectResult {
  if frame.cells() != anchors.cells() {
    warn!(
      "张量网格数 {:?} 与锚框表 {:?} 不一致, 跳过检测",
      frame.cells(),
      anchors.cells()
    );
    return DetectResult::default();
  }

  let start = Instant::now();
  let mut candidates = Vec::with_capacity(64);
  extract_candidates(frame, config.obj_threshold, &mut candidates);
  gather_regressions(frame, &mut candidates);
  trace!("候选锚框 {} 个, 耗时 {:?}", candidates.len(), start.elapsed());

  let detections: Vec<Detection> = candidates
    .iter()
    .map(|candidate| {
      let anchor = &anchors[candidate.anchor_index];
      Detection {
        probability: candidate.probability,
        bbox: decode_box(&candidate.regression, anchor),
        landmarks: decode_landmarks(&candidate.landmarks, anchor),
      }
    })
    .collect();

  let kept = greedy_nms(&detections, config.nms_threshold);
  trace!("NMS 后保留 {} 个, 耗时 {:?}", kept.len(), start.elapsed());

  let letterbox = Letterbox::new(config.input_width, config.input_height);
  let items: Vec<DetectItem> = kept
    .iter()
    .map(|detection| DetectItem {
      score: detection.probability,
      bbox: letterbox.map_box(&detection.bbox),
      landmarks: letterbox.map_landmarks(&detection.landmarks),
    })
    .collect();

  DetectResult {
    items: items.into_boxed_slice(),
  }
}

pub struct RetinaFace {
  config: DetectConfig,
  roi: AeRoiBuilder,
  anchors: &'static AnchorTable,
}

impl RetinaFace {
  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn roi(&self) -> &AeRoiBuilder {
    &self.roi
  }

  fn check_shape(&self, frame: &TensorFrame) -> Result<(), RetinaFaceError> {
    let expected = self.anchors.cells();
    let actual = frame.cells();
    match (0..expected.len()).find(|&scale| expected[scale] != actual[scale]) {
      Some(scale) => Err(RetinaFaceError::TensorShape {
        scale,
        expected: expected[scale],
        actual: actual[scale],
      }),
      None => Ok(()),
    }
  }
}

impl Model for RetinaFace {
  type Input = TensorFrame;
  type Output = FrameReport;
  type Error = RetinaFaceError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.check_shape(input)?;

    let start = Instant::now();
    let result = detect_with_anchors(input, self.anchors, &self.config);
    let ae_roi = self
      .roi
      .is_enabled()
      .then(|| self.roi.build(result.boxes()));

    debug!("检测到 {} 个人脸, 耗时 {:?}", result.len(), start.elapsed());
    Ok(FrameReport { result, ae_roi })
  }
}

#[derive(Debug, Clone)]
pub struct RetinaFaceBuilder {
  detect: DetectConfig,
  roi: AeRoiConfig,
}

impl Default for RetinaFaceBuilder {
  fn default() -> Self {
    Self {
      detect: DetectConfig::default(),
      roi: AeRoiConfig::default(),
    }
  }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, RetinaFaceError> {
  value
    .parse()
    .map_err(|_| RetinaFaceError::InvalidConfig(format!("参数 {} 的值无效: {}", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, RetinaFaceError> {
  match value {
    "1" | "true" => Ok(true),
    "0" | "false" => Ok(false),
    _ => Err(RetinaFaceError::InvalidConfig(format!(
      "参数 {} 的值无效: {}",
      key, value
    ))),
  }
}

impl FromUrlWithScheme for RetinaFaceBuilder {
  const SCHEME: &'static str = "retinaface";
}

impl FromUrl for RetinaFaceBuilder {
  type Error = RetinaFaceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RetinaFaceError::SchemeMismatch(format!(
        "期望模型方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut builder = Self::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "obj_threshold" => builder.detect.obj_threshold = parse_value(&key, &value)?,
        "nms_threshold" => builder.detect.nms_threshold = parse_value(&key, &value)?,
        "input_width" => builder.detect.input_width = parse_value(&key, &value)?,
        "input_height" => builder.detect.input_height = parse_value(&key, &value)?,
        "sensor_width" => builder.roi.sensor_width = parse_value(&key, &value)?,
        "sensor_height" => builder.roi.sensor_height = parse_value(&key, &value)?,
        "offset_h" => builder.roi.offset_h = parse_value(&key, &value)?,
        "offset_v" => builder.roi.offset_v = parse_value(&key, &value)?,
        "ae_roi" => builder.roi.enabled = parse_bool(&key, &value)?,
        _ => warn!("忽略未知的模型参数: {}={}", key, value),
      }
    }

    Ok(builder)
  }
}

impl RetinaFaceBuilder {
  pub fn obj_threshold(mut self, threshold: f32) -> Self {
    self.detect.obj_threshold = threshold;
    self
  }

  pub fn nms_threshold(mut self, threshold: f32) -> Self {
    self.detect.nms_threshold = threshold;
    self
  }

  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.detect.input_width = width;
    self.detect.input_height = height;
    self
  }

  pub fn sensor_size(mut self, width: u32, height: u32) -> Self {
    self.roi.sensor_width = width;
    self.roi.sensor_height = height;
    self
  }

  pub fn sensor_offset(mut self, h_offset: u32, v_offset: u32) -> Self {
    self.roi.offset_h = h_offset;
    self.roi.offset_v = v_offset;
    self
  }

  pub fn ae_roi(mut self, enabled: bool) -> Self {
    self.roi.enabled = enabled;
    self
  }

  pub fn build(self) -> Result<RetinaFace, RetinaFaceError> {
    let Self { detect, mut roi } = self;

    for (name, threshold) in [
      ("obj_threshold", detect.obj_threshold),
      ("nms_threshold", detect.nms_threshold),
    ] {
      if !(0.0..=1.0).contains(&threshold) {
        return Err(RetinaFaceError::InvalidConfig(format!(
          "{} 必须在 [0, 1] 范围内, 实际为 {}",
          name, threshold
        )));
      }
    }

    for (name, size) in [
      ("input_width", detect.input_width),
      ("input_height", detect.input_height),
      ("sensor_width", roi.sensor_width),
      ("sensor_height", roi.sensor_height),
    ] {
      if size == 0 {
        return Err(RetinaFaceError::InvalidConfig(format!("{} 不能为 0", name)));
      }
    }

    // ROI 以检测通道为模型坐标系
    roi.model_width = detect.input_width;
    roi.model_height = detect.input_height;

    info!(
      "RetinaFace 配置: obj_threshold={}, nms_threshold={}, 输入 {}x{}, 传感器 {}x{}, AE ROI {}",
      detect.obj_threshold,
      detect.nms_threshold,
      detect.input_width,
      detect.input_height,
      roi.sensor_width,
      roi.sensor_height,
      if roi.enabled { "开启" } else { "关闭" }
    );

    Ok(RetinaFace {
      config: detect,
      roi: AeRoiBuilder::new(roi),
      anchors: &ANCHORS_320,
    })
  }
}
