// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

/// RetinaFace 人脸检测后处理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型配置，例如 retinaface:///?obj_threshold=0.6&nms_threshold=0.5
  #[arg(long, value_name = "MODEL", default_value = "retinaface:///")]
  pub model: Url,

  /// 张量输入来源
  /// 支持格式:
  /// - npy:///path/to/frames
  /// - raw:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出
  /// 支持格式:
  /// - log:///?display_width=1920&display_height=1080
  /// - folder:///path/to/records[?always]
  /// - image:///path/to/faces.png[?background=...]
  #[arg(long, value_name = "OUTPUT", default_value = "log:///")]
  pub output: Url,

  /// 最大处理帧数，不指定则处理全部输入
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 只处理第一帧
  #[arg(long)]
  pub once: bool,
}
