// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/tensor_dir.rs - 张量目录输入
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

//! 一个目录中放一次推理的九个张量文件即为一帧；
//! 目录下若没有张量文件而只有子目录，则按名称顺序把每个子目录当作一帧。

use std::{
  collections::VecDeque,
  marker::PhantomData,
  path::{Path, PathBuf},
};

use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{SCALE_NUM, TensorFrame},
  input::{InputError, TensorFileFormat},
  model::anchors::ANCHORS_320,
  url_path,
};

pub struct TensorDirInput<F> {
  frames: VecDeque<PathBuf>,
  cells: [usize; SCALE_NUM],
  _format: PhantomData<F>,
}

impl<F: TensorFileFormat> FromUrlWithScheme for TensorDirInput<F> {
  const SCHEME: &'static str = F::SCHEME;
}

impl<F: TensorFileFormat> FromUrl for TensorDirInput<F> {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch(format!(
        "期望输入方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::open(url_path(url))
  }
}

fn has_extension(path: &Path, extension: &str) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

impl<F: TensorFileFormat> TensorDirInput<F> {
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, InputError> {
    let root = root.into();
    if !root.is_dir() {
      return Err(InputError::NotADirectory(root.display().to_string()));
    }

    let frames = if Self::tensor_files(&root)?.is_empty() {
      let mut dirs = Vec::new();
      for entry in std::fs::read_dir(&root)? {
        let path = entry?.path();
        if path.is_dir() {
          dirs.push(path);
        }
      }
      dirs.sort();
      dirs
    } else {
      vec![root.clone()]
    };

    if frames.is_empty() {
      return Err(InputError::EmptyDirectory(root.display().to_string()));
    }

    info!(
      "打开张量输入 {}://{}, 共 {} 帧",
      F::SCHEME,
      root.display(),
      frames.len()
    );

    Ok(Self {
      frames: frames.into(),
      cells: ANCHORS_320.cells(),
      _format: PhantomData,
    })
  }

  /// 指定每个尺度的网格数（默认与 320x320 锚框表一致）
  pub fn with_cells(mut self, cells: [usize; SCALE_NUM]) -> Self {
    self.cells = cells;
    self
  }

  pub fn remaining(&self) -> usize {
    self.frames.len()
  }

  fn tensor_files(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
      let path = entry?.path();
      if path.is_file() && has_extension(&path, F::EXTENSION) {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }

  /// 读取一个帧目录，按元素数量识别张量
  pub fn load_frame(&self, dir: &Path) -> Result<TensorFrame, InputError> {
    let files = Self::tensor_files(dir)?;
    if files.is_empty() {
      return Err(InputError::EmptyDirectory(dir.display().to_string()));
    }

    let mut tensors = Vec::with_capacity(files.len());
    for file in &files {
      let tensor = F::read_tensor(file)?;
      debug!("读取张量 {}: {} 个元素", file.display(), tensor.len());
      tensors.push(tensor);
    }

    TensorFrame::from_unordered(tensors, self.cells).map_err(|source| InputError::TensorLayout {
      path: dir.display().to_string(),
      source,
    })
  }
}

impl<F: TensorFileFormat> Iterator for TensorDirInput<F> {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(dir) = self.frames.pop_front() {
      match self.load_frame(&dir) {
        Ok(frame) => return Some(frame),
        Err(e) => error!("跳过无法加载的帧 {}: {}", dir.display(), e),
      }
    }
    None
  }
}
