// 该文件是 Qingxing （清醒） 项目的一部分。
// src/config.rs - 运行配置
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

use std::{path::PathBuf, time::Duration};

use thiserror::Error;
use url::Url;

use crate::{
  alert::EvidencePolicy, encode::DEFAULT_JPEG_QUALITY, model::DEFAULT_TIMEOUT,
  output::DEFAULT_EVIDENCE_DIR,
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REPORT_EVERY: u64 = 30;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("JPEG 质量必须在 0-100 之间, 实际为 {0}")]
  QualityOutOfRange(u32),
  #[error("周期间隔无效: {0} 秒")]
  InvalidInterval(f64),
  #[error("响应超时无效: {0} 秒")]
  InvalidTimeout(f64),
  #[error("吞吐量统计周期必须大于 0")]
  InvalidReportPeriod,
  #[error("检测服务地址必须是 http 或 https: {0}")]
  InvalidEndpoint(String),
}

/// 启动时构造一次、之后只读的运行配置
#[derive(Debug, Clone)]
pub struct MonitorConfig {
  pub endpoint: Url,
  pub device: usize,
  pub input: Option<Url>,
  pub interval: Duration,
  pub quality: u8,
  pub save_evidence: bool,
  pub evidence_dir: PathBuf,
  pub evidence_policy: EvidencePolicy,
  pub timeout: Duration,
  pub font: Option<PathBuf>,
  pub max_frames: Option<u64>,
  pub report_every: u64,
}

impl MonitorConfig {
  pub fn new(endpoint: Url) -> Self {
    Self {
      endpoint,
      device: 0,
      input: None,
      interval: DEFAULT_INTERVAL,
      quality: DEFAULT_JPEG_QUALITY,
      save_evidence: true,
      evidence_dir: PathBuf::from(DEFAULT_EVIDENCE_DIR),
      evidence_policy: EvidencePolicy::default(),
      timeout: DEFAULT_TIMEOUT,
      font: None,
      max_frames: None,
      report_every: DEFAULT_REPORT_EVERY,
    }
  }

  pub fn with_interval_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
    self.interval = Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidInterval(secs))?;
    Ok(self)
  }

  pub fn with_timeout_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
    match Duration::try_from_secs_f64(secs) {
      Ok(timeout) if !timeout.is_zero() => self.timeout = timeout,
      _ => return Err(ConfigError::InvalidTimeout(secs)),
    }
    Ok(self)
  }

  pub fn with_quality(mut self, quality: u32) -> Result<Self, ConfigError> {
    self.quality = u8::try_from(quality)
      .ok()
      .filter(|q| *q <= 100)
      .ok_or(ConfigError::QualityOutOfRange(quality))?;
    Ok(self)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !matches!(self.endpoint.scheme(), "http" | "https") {
      return Err(ConfigError::InvalidEndpoint(self.endpoint.to_string()));
    }
    if self.quality > 100 {
      return Err(ConfigError::QualityOutOfRange(self.quality as u32));
    }
    if self.timeout.is_zero() {
      return Err(ConfigError::InvalidTimeout(0.0));
    }
    if self.report_every == 0 {
      return Err(ConfigError::InvalidReportPeriod);
    }
    Ok(())
  }
}
