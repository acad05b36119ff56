// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::FrameReport,
  output::{Render, draw::Draw},
  url_path,
};

pub struct SaveImageFileOutput {
  path: String,
  background: Option<RgbImage>,
  width: u32,
  height: u32,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数 {key} 的值无效: {value}")]
  InvalidParameter { key: String, value: String },
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut width: u32 = 1280;
    let mut height: u32 = 720;
    let mut background = None;
    for (key, value) in uri.query_pairs() {
      let invalid = || SaveImageFileError::InvalidParameter {
        key: key.to_string(),
        value: value.to_string(),
      };
      match key.as_ref() {
        "width" => width = value.parse().map_err(|_| invalid())?,
        "height" => height = value.parse().map_err(|_| invalid())?,
        "background" => {
          let image = image::open(&*value).map_err(SaveImageFileError::ImageError)?;
          background = Some(image.to_rgb8());
        }
        _ => warn!("忽略未知的输出参数: {}={}", key, value),
      }
    }

    if width == 0 || height == 0 {
      return Err(SaveImageFileError::InvalidParameter {
        key: "width/height".to_string(),
        value: format!("{}x{}", width, height),
      });
    }

    Ok(SaveImageFileOutput {
      path: url_path(uri),
      background,
      width,
      height,
      draw: Draw::default(),
    })
  }
}

impl SaveImageFileOutput {
  /// 有背景图时在背景图上绘制，否则使用检测通道尺寸的黑色画布
  fn canvas(&self) -> RgbImage {
    match &self.background {
      Some(image) => image.clone(),
      None => RgbImage::new(self.width, self.height),
    }
  }

  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render<TensorFrame, FrameReport> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, _frame: &TensorFrame, report: &FrameReport) -> Result<(), Self::Error> {
    let mut image = self.canvas();
    self.draw.draw_detection(&mut image, &report.result);
    self.save_image(image)
  }
}
