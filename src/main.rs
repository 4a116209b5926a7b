// 该文件是 Qingxing （清醒） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use qingxing::{
  FromUrl,
  input::InputWrapper,
  model::RemoteModel,
  output::{AlertOverlay, AlertResponder, EvidenceRecorder},
  signal::StopSignal,
  task::{MonitorTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let config = args::Args::parse().into_config()?;

  info!("Qingxing 疲劳监测");
  info!("检测服务地址: {}", config.endpoint);
  match &config.input {
    Some(input) => info!("输入来源: {}", input),
    None => info!("摄像头序号: {}", config.device),
  }
  info!("周期间隔: {:?}", config.interval);
  info!("JPEG 质量: {}", config.quality);
  info!("响应超时: {:?}", config.timeout);
  if config.save_evidence {
    info!(
      "证据目录: {} ({:?})",
      config.evidence_dir.display(),
      config.evidence_policy
    );
  } else {
    info!("不保存告警证据");
  }

  let overlay = match &config.font {
    Some(path) => {
      let data = std::fs::read(path).with_context(|| format!("无法读取字体文件: {}", path.display()))?;
      AlertOverlay::with_font(data).with_context(|| format!("无效的字体文件: {}", path.display()))?
    }
    None => AlertOverlay::default(),
  };
  let recorder = config
    .save_evidence
    .then(|| EvidenceRecorder::new(&config.evidence_dir));
  let responder = AlertResponder::new(overlay, recorder, config.evidence_policy);

  let model = RemoteModel::new(&config.endpoint, config.timeout);

  info!("正在打开输入源...");
  let input = match &config.input {
    Some(url) => InputWrapper::from_url(url)?,
    None => InputWrapper::open_device(config.device)?,
  };

  let stop = StopSignal::install_ctrlc()?;
  let report = MonitorTask::from_config(&config, stop).run_task(input, model, responder)?;

  info!(
    "运行结束 ({:?})，共采集 {} 帧，耗时 {:.2?}",
    report.stop_reason, report.frame_count, report.elapsed
  );
  Ok(())
}
