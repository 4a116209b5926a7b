// 该文件是 Qingxing （清醒） 项目的一部分。
// src/bin/drowsy_probe.rs - 单张图片检测
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use qingxing::{
  FromUrl,
  encode::JpegFrameEncoder,
  input::InputWrapper,
  model::{DEFAULT_TIMEOUT, RemoteModel},
  task::{OneShotTask, Task},
};
use tracing::info;

/// 将一张图片发送给检测服务并打印结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测服务地址
  #[arg(long, value_name = "URL")]
  pub endpoint: Url,
  /// 输入来源，例如 image:///path/to/face.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// JPEG 压缩质量 (0 - 100)
  #[arg(long, default_value = "80", value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(0..=100))]
  pub quality: u8,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测服务地址: {}", args.endpoint);
  info!("输入来源: {}", args.input);

  let input = InputWrapper::from_url(&args.input)?;
  let model = RemoteModel::new(&args.endpoint, DEFAULT_TIMEOUT);

  let result = OneShotTask::new(JpegFrameEncoder::new(args.quality)).run_task(input, model, ())?;

  println!("状态: {}", result.status);
  println!("疲劳: {}", result.is_drowsy);
  for det in &result.detections {
    println!(
      "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}, {:.0})",
      det.label,
      det.confidence * 100.0,
      det.bbox[0],
      det.bbox[1],
      det.bbox[2],
      det.bbox[3]
    );
  }

  Ok(())
}
