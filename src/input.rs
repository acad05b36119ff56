// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 张量帧输入
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

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::FrameError, frame::TensorFrame};

mod tensor_dir;
pub use self::tensor_dir::TensorDirInput;

#[cfg(feature = "read_npy_file")]
mod read_npy_file;
#[cfg(feature = "read_npy_file")]
pub use self::read_npy_file::NpyFormat;

mod read_raw_file;
pub use self::read_raw_file::RawFormat;

#[cfg(feature = "read_npy_file")]
pub type NpyInput = TensorDirInput<NpyFormat>;
pub type RawInput = TensorDirInput<RawFormat>;

/// 一种张量文件格式：URL 方案、文件扩展名与读取方式
pub trait TensorFileFormat {
  const SCHEME: &'static str;
  const EXTENSION: &'static str;

  fn read_tensor(path: &Path) -> Result<Vec<f32>, InputError>;
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("输入路径不存在或不是目录: {0}")]
  NotADirectory(String),
  #[error("目录中没有张量文件: {0}")]
  EmptyDirectory(String),
  #[error("张量布局错误 {path}: {source}")]
  TensorLayout {
    path: String,
    #[source]
    source: FrameError,
  },
  #[error("原始张量文件 {path} 长度 {len} 不是 4 字节的整数倍")]
  RawLength { path: String, len: usize },
  #[cfg(feature = "read_npy_file")]
  #[error("不支持 Fortran 顺序的 npy 文件: {0}")]
  NpyOrder(String),
}

pub enum InputWrapper {
  #[cfg(feature = "read_npy_file")]
  Npy(NpyInput),
  Raw(RawInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_npy_file")]
    {
      if url.scheme() == NpyInput::SCHEME {
        return Ok(InputWrapper::Npy(NpyInput::from_url(url)?));
      }
    }
    if url.scheme() == RawInput::SCHEME {
      return Ok(InputWrapper::Raw(RawInput::from_url(url)?));
    }
    Err(InputError::SchemeMismatch(format!(
      "不支持的输入方案 '{}'",
      url.scheme()
    )))
  }
}

impl InputWrapper {
  /// 尚未读取的帧数
  pub fn remaining(&self) -> usize {
    match self {
      #[cfg(feature = "read_npy_file")]
      InputWrapper::Npy(input) => input.remaining(),
      InputWrapper::Raw(input) => input.remaining(),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_npy_file")]
      InputWrapper::Npy(input) => input.next(),
      InputWrapper::Raw(input) => input.next(),
    }
  }
}
