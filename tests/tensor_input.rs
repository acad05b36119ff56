// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/tensor_input.rs - 张量目录输入
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

use std::path::Path;

use url::Url;

use shanan_face::{
  FromUrl,
  frame::{FrameError, SCALE_NUM, TensorKind},
  input::{InputError, InputWrapper, RawInput},
  model::anchors::ANCHORS_320,
};

/// 九个张量的长度互不相同
const SMALL_CELLS: [usize; SCALE_NUM] = [16, 4, 1];

fn write_raw(path: &Path, data: &[f32]) {
  let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
  std::fs::write(path, bytes).unwrap();
}

/// 写入一帧的九个张量，每个张量的所有元素都等于 `marker`
fn write_frame(dir: &Path, cells: [usize; SCALE_NUM], marker: f32) {
  std::fs::create_dir_all(dir).unwrap();
  for (scale, &n) in cells.iter().enumerate() {
    for kind in TensorKind::ALL {
      let path = dir.join(format!("{}_{}.bin", kind, scale));
      write_raw(&path, &vec![marker; kind.channels() * n]);
    }
  }
}

fn raw_url(dir: &Path) -> Url {
  let url = Url::from_directory_path(dir).unwrap();
  Url::parse(&url.as_str().replacen("file", "raw", 1)).unwrap()
}

#[test]
fn test_single_frame_directory() {
  let dir = tempfile::tempdir().unwrap();
  write_frame(dir.path(), SMALL_CELLS, 1.5);

  let mut input = RawInput::open(dir.path()).unwrap().with_cells(SMALL_CELLS);
  assert_eq!(input.remaining(), 1);

  let frame = input.next().unwrap();
  assert_eq!(frame.cells(), SMALL_CELLS);
  for scale in frame.scales() {
    assert!(scale.conf().iter().all(|&v| v == 1.5));
    assert!(scale.loc().iter().all(|&v| v == 1.5));
    assert!(scale.landms().iter().all(|&v| v == 1.5));
  }
  assert!(input.next().is_none());
}

#[test]
fn test_frame_sequence_skips_broken_frame() {
  let dir = tempfile::tempdir().unwrap();
  write_frame(&dir.path().join("0002"), SMALL_CELLS, 2.0);
  write_frame(&dir.path().join("0000"), SMALL_CELLS, 0.0);

  // 缺少一个张量
  let broken = dir.path().join("0001");
  write_frame(&broken, SMALL_CELLS, 1.0);
  std::fs::remove_file(broken.join("loc_1.bin")).unwrap();

  let input = RawInput::open(dir.path()).unwrap().with_cells(SMALL_CELLS);
  assert_eq!(input.remaining(), 3);

  let markers: Vec<f32> = input.map(|frame| frame.scales()[0].conf()[0]).collect();
  assert_eq!(markers, vec![0.0, 2.0]);
}

#[test]
fn test_load_frame_reports_layout_error() {
  let dir = tempfile::tempdir().unwrap();
  write_frame(dir.path(), SMALL_CELLS, 0.0);
  std::fs::remove_file(dir.path().join("landms_2.bin")).unwrap();

  let input = RawInput::open(dir.path()).unwrap().with_cells(SMALL_CELLS);
  match input.load_frame(dir.path()) {
    Err(InputError::TensorLayout {
      source: FrameError::MissingTensor { scale, kind },
      ..
    }) => {
      assert_eq!(scale, 2);
      assert_eq!(kind, TensorKind::Landms);
    }
    Err(e) => panic!("unexpected error: {e}"),
    Ok(_) => panic!("broken frame loaded"),
  }
}

#[test]
fn test_load_frame_rejects_truncated_file() {
  let dir = tempfile::tempdir().unwrap();
  write_frame(dir.path(), SMALL_CELLS, 0.0);
  std::fs::write(dir.path().join("conf_0.bin"), [0u8; 7]).unwrap();

  let input = RawInput::open(dir.path()).unwrap().with_cells(SMALL_CELLS);
  assert!(matches!(
    input.load_frame(dir.path()),
    Err(InputError::RawLength { len: 7, .. })
  ));
}

#[test]
fn test_open_rejects_missing_and_empty_directory() {
  let dir = tempfile::tempdir().unwrap();
  assert!(matches!(
    RawInput::open(dir.path().join("missing")),
    Err(InputError::NotADirectory(_))
  ));
  assert!(matches!(
    RawInput::open(dir.path()),
    Err(InputError::EmptyDirectory(_))
  ));
}

#[test]
fn test_wrapper_from_raw_url() {
  let dir = tempfile::tempdir().unwrap();
  write_frame(dir.path(), ANCHORS_320.cells(), 0.0);

  let mut input = InputWrapper::from_url(&raw_url(dir.path())).unwrap();
  assert_eq!(input.remaining(), 1);
  let frame = input.next().unwrap();
  assert_eq!(frame.cells(), [1600, 400, 100]);
}

#[test]
fn test_wrapper_rejects_unknown_scheme() {
  let url = Url::parse("v4l2:///dev/video0").unwrap();
  assert!(matches!(
    InputWrapper::from_url(&url),
    Err(InputError::SchemeMismatch(_))
  ));
}

#[cfg(feature = "read_npy_file")]
mod npy {
  use std::{fs::File, io::BufWriter, path::Path};

  use npyz::WriterBuilder;
  use url::Url;

  use shanan_face::{
    FromUrl,
    frame::{SCALE_NUM, TensorKind},
    input::{InputWrapper, NpyInput},
  };

  use super::SMALL_CELLS;

  fn write_npy(path: &Path, shape: &[u64], data: &[f32]) {
    let mut writer = BufWriter::new(File::create(path).unwrap());
    let mut npy = npyz::WriteOptions::<f32>::new()
      .default_dtype()
      .shape(shape)
      .writer(&mut writer)
      .begin_nd()
      .unwrap();
    npy.extend(data.iter().copied()).unwrap();
    npy.finish().unwrap();
  }

  /// 按模型输出的 NCHW 形状写入，值为元素的扁平索引
  fn write_frame(dir: &Path, cells: [usize; SCALE_NUM], grid: [[u64; 2]; SCALE_NUM]) {
    for (scale, &n) in cells.iter().enumerate() {
      for kind in TensorKind::ALL {
        let path = dir.join(format!("{}_{}.npy", kind, scale));
        let data: Vec<f32> = (0..kind.channels() * n).map(|v| v as f32).collect();
        let [h, w] = grid[scale];
        write_npy(&path, &[1, kind.channels() as u64, h, w], &data);
      }
    }
  }

  #[test]
  fn test_npy_small_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), SMALL_CELLS, [[4, 4], [2, 2], [1, 1]]);

    let input = NpyInput::open(dir.path())
      .unwrap()
      .with_cells(SMALL_CELLS);
    let frame = input.load_frame(dir.path()).unwrap();
    assert_eq!(frame.cells(), SMALL_CELLS);
    assert_eq!(frame.scales()[0].loc()[3 * 16 + 2], 50.0);
    assert_eq!(frame.scales()[2].conf(), &[0.0, 1.0, 2.0, 3.0]);
  }

  #[test]
  fn test_wrapper_from_npy_url() {
    let dir = tempfile::tempdir().unwrap();
    let cells = [1600, 400, 100];
    write_frame(dir.path(), cells, [[40, 40], [20, 20], [10, 10]]);

    let url = Url::from_directory_path(dir.path()).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "npy", 1)).unwrap();
    let mut input = InputWrapper::from_url(&url).unwrap();
    let frame = input.next().unwrap();

    assert_eq!(frame.cells(), cells);
    let conf = frame.scales()[1].conf();
    // 通道 c、网格 i 的值为 c * cells + i
    assert_eq!(conf[0], 0.0);
    assert_eq!(conf[400 + 7], 407.0);
    assert_eq!(frame.scales()[2].landms()[19 * 100 + 99], 1999.0);
  }
}
