// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_npy_file.rs - 读取 npy 张量文件
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

use std::{fs::File, io::BufReader, path::Path};

use npyz::{NpyFile, Order};
use tracing::trace;

use crate::input::{InputError, TensorFileFormat};

/// numpy `.npy` 文件，仅支持 f32 与 C 顺序
pub struct NpyFormat;

impl TensorFileFormat for NpyFormat {
  const SCHEME: &'static str = "npy";
  const EXTENSION: &'static str = "npy";

  fn read_tensor(path: &Path) -> Result<Vec<f32>, InputError> {
    let npy = NpyFile::new(BufReader::new(File::open(path)?))?;
    if matches!(npy.order(), Order::Fortran) {
      return Err(InputError::NpyOrder(path.display().to_string()));
    }
    trace!("npy 文件 {} 形状 {:?}", path.display(), npy.shape());
    Ok(npy.into_vec::<f32>()?)
  }
}
