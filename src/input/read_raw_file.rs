// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_raw_file.rs - 读取原始 f32 张量文件
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

use crate::input::{InputError, TensorFileFormat};

/// 无文件头的小端 f32 数组（`.bin`）
pub struct RawFormat;

impl TensorFileFormat for RawFormat {
  const SCHEME: &'static str = "raw";
  const EXTENSION: &'static str = "bin";

  fn read_tensor(path: &Path) -> Result<Vec<f32>, InputError> {
    let bytes = std::fs::read(path)?;
    decode_f32_le(&bytes).ok_or_else(|| InputError::RawLength {
      path: path.display().to_string(),
      len: bytes.len(),
    })
  }
}

fn decode_f32_le(bytes: &[u8]) -> Option<Vec<f32>> {
  if bytes.len() % 4 != 0 {
    return None;
  }
  Some(
    bytes
      .chunks_exact(4)
      .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
      .collect(),
  )
}
