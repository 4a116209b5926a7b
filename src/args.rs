// 该文件是 Qingxing （清醒） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use qingxing::{
  alert::EvidencePolicy,
  config::{ConfigError, MonitorConfig},
};

/// Qingxing 疲劳监测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测服务地址，例如 http://127.0.0.1:5000/detect_drowsiness
  #[arg(long, value_name = "URL")]
  pub endpoint: Url,

  /// 摄像头序号（/dev/video<N>）
  #[arg(long, default_value = "0", value_name = "INDEX")]
  pub device: usize,

  /// 替代摄像头的输入来源
  /// 支持格式:
  /// - 图片: image:///path/to/face.jpg?repeat=35
  /// - V4L: v4l:///dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: Option<Url>,

  /// 周期间隔（秒）
  #[arg(long, default_value = "1.0", value_name = "SECONDS")]
  pub interval: f64,

  /// JPEG 压缩质量 (0 - 100)
  #[arg(long, default_value = "80", value_name = "QUALITY")]
  pub quality: u32,

  /// 不保存告警证据帧
  #[arg(long)]
  pub no_evidence: bool,

  /// 告警证据保存目录
  #[arg(long, default_value = "drowsiness_captures", value_name = "DIR")]
  pub evidence_dir: PathBuf,

  /// 证据保存策略
  #[arg(long, value_enum, default_value_t = EvidencePolicy::Every)]
  pub evidence_policy: EvidencePolicy,

  /// 检测服务响应超时（秒）
  #[arg(long, default_value = "5.0", value_name = "SECONDS")]
  pub timeout: f64,

  /// 告警横幅使用的 TrueType 字体文件
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 最大处理帧数（不指定表示无限制）
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<u64>,

  /// 每多少帧输出一次吞吐量统计
  #[arg(long, default_value = "30", value_name = "COUNT")]
  pub report_every: u64,
}

impl Args {
  pub fn into_config(self) -> Result<MonitorConfig, ConfigError> {
    let mut config = MonitorConfig::new(self.endpoint)
      .with_interval_secs(self.interval)?
      .with_timeout_secs(self.timeout)?
      .with_quality(self.quality)?;

    config.device = self.device;
    config.input = self.input;
    config.save_evidence = !self.no_evidence;
    config.evidence_dir = self.evidence_dir;
    config.evidence_policy = self.evidence_policy;
    config.font = self.font;
    config.max_frames = self.max_frames;
    config.report_every = self.report_every;

    config.validate()?;
    Ok(config)
  }
}
