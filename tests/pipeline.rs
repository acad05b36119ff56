// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/pipeline.rs - 从张量帧到检测结果与 AE ROI 的完整流程
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

use std::{cell::Cell, convert::Infallible};

use shanan_face::{
  frame::TensorFrame,
  model::{
    DetectConfig, FrameReport, Model, RetinaFaceBuilder, RetinaFaceError,
    anchors::ANCHORS_320,
    candidate::face_probability,
    detect,
  },
  output::Render,
  task::{ContinuousTask, OneShotTask, Task},
};

/// 尺度 1（20x20，步长 16）第 10 行第 6 列，锚框 0 的中心为 (0.325, 0.525)，边长 0.2
const FACE_CELL: usize = 206;
/// 右侧相邻网格，中心 x 为 0.375
const NEIGHBOR_CELL: usize = 207;

fn empty_frame() -> TensorFrame {
  TensorFrame::zeros(ANCHORS_320.cells())
}

fn single_face_frame() -> TensorFrame {
  let mut frame = empty_frame();
  frame.scale_mut(1).set_conf(FACE_CELL, 0, -5.0, 5.0);
  frame
}

/// 相邻网格预测出同一张脸：dx = -2.5 把中心移回 0.325
fn duplicated_face_frame() -> TensorFrame {
  let mut frame = single_face_frame();
  let scale = frame.scale_mut(1);
  scale.set_conf(NEIGHBOR_CELL, 0, -2.0, 2.0);
  scale.set_loc(NEIGHBOR_CELL, 0, [-2.5, 0.0, 0.0, 0.0]);
  frame
}

fn assert_near(actual: i64, expected: i64, tolerance: i64) {
  assert!(
    (actual - expected).abs() <= tolerance,
    "actual {actual}, expected {expected} ± {tolerance}"
  );
}

#[test]
fn test_single_face_maps_to_input_frame() {
  let result = detect(&single_face_frame(), &DetectConfig::default());
  assert_eq!(result.len(), 1);

  let item = &result.items[0];
  assert!((item.score - face_probability(-5.0, 5.0)).abs() < 1e-6);

  // 1280x720 letterbox 到 1280x1280，纵向填充 280
  let bbox = item.bbox;
  assert_near(bbox.x1 as i64, 288, 1);
  assert_near(bbox.y1 as i64, 264, 1);
  assert_near(bbox.x2 as i64, 544, 1);
  assert_near(bbox.y2 as i64, 520, 1);

  // 关键点回归为零时全部落在锚框中心
  for [x, y] in item.landmarks.points {
    assert_near(x as i64, 416, 1);
    assert_near(y as i64, 392, 1);
  }
}

#[test]
fn test_duplicate_is_suppressed() {
  let result = detect(&duplicated_face_frame(), &DetectConfig::default());
  assert_eq!(result.len(), 1);
  assert!((result.items[0].score - face_probability(-5.0, 5.0)).abs() < 1e-6);
}

#[test]
fn test_disjoint_faces_sorted_by_score() {
  let mut frame = single_face_frame();
  // 尺度 0 左上角的小锚框，与尺度 1 的人脸不重叠
  frame.scale_mut(0).set_conf(0, 0, -2.0, 2.0);

  let result = detect(&frame, &DetectConfig::default());
  assert_eq!(result.len(), 2);
  assert!(result.items[0].score > result.items[1].score);
  assert_near(result.items[0].bbox.x1 as i64, 288, 1);
  assert_eq!(result.items[1].bbox.x1, 1);
}

#[test]
fn test_high_threshold_rejects_everything() {
  let config = DetectConfig {
    obj_threshold: 1.0,
    ..DetectConfig::default()
  };
  // face_probability(-2, 2) 约为 0.982，不会通过阈值 1
  let mut frame = empty_frame();
  frame.scale_mut(0).set_conf(0, 1, -2.0, 2.0);
  assert!(detect(&frame, &config).is_empty());
}

#[test]
fn test_model_builds_roi_from_faces() -> anyhow::Result<()> {
  let model = RetinaFaceBuilder::default().build()?;
  let report = model.infer(&single_face_frame())?;
  assert_eq!(report.result.len(), 1);

  let roi = report.ae_roi.expect("AE ROI 默认开启");
  assert_eq!(roi.len(), 1);
  let window = roi.windows()[0];
  // 1280x720 → 1920x1080，放大 1.5 倍
  assert_near(window.h_offset as i64, 432, 2);
  assert_near(window.v_offset as i64, 396, 2);
  assert_near(window.width as i64, 384, 2);
  assert_near(window.height as i64, 384, 2);
  assert!((window.weight - 1.0).abs() < 1e-6);
  Ok(())
}

#[test]
fn test_empty_frame_gives_empty_report() -> anyhow::Result<()> {
  let model = RetinaFaceBuilder::default().build()?;
  let report = model.infer(&empty_frame())?;
  assert!(report.result.is_empty());
  assert!(report.ae_roi.is_some_and(|roi| roi.is_empty()));
  Ok(())
}

#[test]
fn test_model_rejects_mismatched_frame() -> anyhow::Result<()> {
  let model = RetinaFaceBuilder::default().build()?;
  let frame = TensorFrame::zeros([1600, 400, 64]);
  assert!(matches!(
    model.infer(&frame),
    Err(RetinaFaceError::TensorShape {
      scale: 2,
      expected: 100,
      actual: 64
    })
  ));

  // 自由函数遇到形状不一致时返回空结果
  assert!(detect(&frame, &DetectConfig::default()).is_empty());
  Ok(())
}

/// 统计渲染次数与 finish 调用
#[derive(Default)]
struct CountingRender {
  frames: Cell<usize>,
  faces: Cell<usize>,
  finished: Cell<bool>,
}

impl Render<TensorFrame, FrameReport> for &CountingRender {
  type Error = Infallible;

  fn render_result(&self, _frame: &TensorFrame, result: &FrameReport) -> Result<(), Self::Error> {
    self.frames.set(self.frames.get() + 1);
    self.faces.set(self.faces.get() + result.result.len());
    Ok(())
  }

  fn finish(&self) -> Result<(), Self::Error> {
    self.finished.set(true);
    Ok(())
  }
}

#[test]
fn test_continuous_task_processes_every_frame() -> anyhow::Result<()> {
  let frames = vec![single_face_frame(), empty_frame(), duplicated_face_frame()];
  let model = RetinaFaceBuilder::default().build()?;
  let output = CountingRender::default();

  ContinuousTask::default()
    .without_interrupt_handler()
    .run_task(frames.into_iter(), model, &output)?;

  assert_eq!(output.frames.get(), 3);
  assert_eq!(output.faces.get(), 2);
  assert!(output.finished.get());
  Ok(())
}

#[test]
fn test_continuous_task_stops_at_frame_number() -> anyhow::Result<()> {
  let frames = std::iter::repeat_with(single_face_frame).take(10);
  let model = RetinaFaceBuilder::default().build()?;
  let output = CountingRender::default();

  ContinuousTask::default()
    .without_interrupt_handler()
    .with_frame_number(Some(4))
    .run_task(frames, model, &output)?;

  assert_eq!(output.frames.get(), 4);
  assert!(output.finished.get());
  Ok(())
}

#[test]
fn test_one_shot_requires_a_frame() -> anyhow::Result<()> {
  let model = RetinaFaceBuilder::default().build()?;
  let output = CountingRender::default();
  assert!(
    OneShotTask
      .run_task(std::iter::empty::<TensorFrame>(), model, &output)
      .is_err()
  );
  assert_eq!(output.frames.get(), 0);

  let model = RetinaFaceBuilder::default().build()?;
  OneShotTask.run_task(std::iter::once(single_face_frame()), model, &output)?;
  assert_eq!(output.frames.get(), 1);
  assert_eq!(output.faces.get(), 1);
  Ok(())
}
