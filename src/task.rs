// 该文件是 Qingxing （清醒） 项目的一部分。
// src/task.rs - 采集-推理-告警循环
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

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::{
  config::{DEFAULT_INTERVAL, DEFAULT_REPORT_EVERY, MonitorConfig},
  encode::JpegFrameEncoder,
  input::{CaptureError, FrameSource},
  model::{InferenceRequest, InferenceResult, Model},
  output::{Evidence, Render},
  signal::StopSignal,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 采集一帧、推理一次，不做告警反应
pub struct OneShotTask {
  encoder: JpegFrameEncoder,
}

impl OneShotTask {
  pub fn new(encoder: JpegFrameEncoder) -> Self {
    Self { encoder }
  }
}

impl<I: FrameSource, M: Model> Task<I, M, ()> for OneShotTask {
  type Output = InferenceResult;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, _output: ()) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.acquire();
    input.release();
    let frame = frame?;
    info!("输入帧获取成功 ({}x{})，开始推理...", frame.width(), frame.height());

    let encoded = self.encoder.encode(&frame)?;
    let now = Instant::now();
    let result = model.infer(&InferenceRequest::new(&encoded, &frame))?;
    info!(
      "推理完成，耗时: {:.2?}，状态: {}，疲劳: {}",
      now.elapsed(),
      result.status,
      result.is_drowsy
    );
    Ok(result)
  }
}

/// 吞吐量统计：帧数与开始时刻，只增不减
#[derive(Debug)]
pub struct RunStats {
  frame_count: u64,
  started: Instant,
  report_every: u64,
}

/// 周期性的吞吐量报告
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
  pub frame_count: u64,
  pub elapsed: Duration,
  pub fps: f64,
}

impl RunStats {
  pub fn new(report_every: u64) -> Self {
    Self {
      frame_count: 0,
      started: Instant::now(),
      report_every: report_every.max(1),
    }
  }

  pub fn frame_count(&self) -> u64 {
    self.frame_count
  }

  pub fn elapsed(&self) -> Duration {
    self.started.elapsed()
  }

  pub fn throughput(&self) -> Throughput {
    let elapsed = self.elapsed();
    let secs = elapsed.as_secs_f64();
    Throughput {
      frame_count: self.frame_count,
      elapsed,
      fps: if secs > 0.0 {
        self.frame_count as f64 / secs
      } else {
        0.0
      },
    }
  }

  /// 记录一帧；每 `report_every` 帧返回一次报告
  pub fn record_frame(&mut self) -> Option<Throughput> {
    self.frame_count += 1;
    (self.frame_count % self.report_every == 0).then(|| self.throughput())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
  Interrupted,
  CaptureFailed,
  InputExhausted,
  FrameLimit,
}

/// 循环结束时的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
  pub frame_count: u64,
  pub elapsed: Duration,
  pub throughput_reports: u64,
  pub alerts: u64,
  pub evidence_saved: u64,
  pub failed_cycles: u64,
  pub stop_reason: StopReason,
}

/// 固定间隔的单线程监控循环
///
/// 每个周期依次执行 采集 -> 编码 -> 推理 -> 反应 -> 休眠，周期之间没有重叠。
/// 休眠时长固定，不扣除本周期耗时。停止信号只在采集前和休眠中检查。
pub struct MonitorTask {
  encoder: JpegFrameEncoder,
  interval: Duration,
  stop: StopSignal,
  max_frames: Option<u64>,
  report_every: u64,
}

impl MonitorTask {
  pub fn new(encoder: JpegFrameEncoder, stop: StopSignal) -> Self {
    Self {
      encoder,
      interval: DEFAULT_INTERVAL,
      stop,
      max_frames: None,
      report_every: DEFAULT_REPORT_EVERY,
    }
  }

  pub fn from_config(config: &MonitorConfig, stop: StopSignal) -> Self {
    Self::new(JpegFrameEncoder::new(config.quality), stop)
      .with_interval(config.interval)
      .with_max_frames(config.max_frames)
      .with_report_every(config.report_every)
  }

  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
    self.max_frames = max_frames;
    self
  }

  pub fn with_report_every(mut self, report_every: u64) -> Self {
    self.report_every = report_every;
    self
  }

  fn cycles<I, M, O>(
    &self,
    input: &mut I,
    model: &M,
    output: &mut O,
    report: &mut RunReport,
  ) -> anyhow::Result<StopReason>
  where
    I: FrameSource,
    M: Model,
    O: Render,
    O::Error: std::fmt::Display,
  {
    let mut stats = RunStats::new(self.report_every);

    let reason = loop {
      if self.stop.is_stopped() {
        warn!("中断信号接收，退出任务循环");
        break StopReason::Interrupted;
      }

      let frame = match input.acquire() {
        Ok(frame) => frame,
        Err(CaptureError::Exhausted) => {
          info!("输入已结束，退出任务循环");
          break StopReason::InputExhausted;
        }
        Err(e) => {
          error!("{}，退出任务循环", e);
          break StopReason::CaptureFailed;
        }
      };

      let throughput = stats.record_frame();
      report.frame_count = stats.frame_count();

      let encoded = self.encoder.encode(&frame)?;
      let request = InferenceRequest::new(&encoded, &frame);
      drop(encoded);

      match model.infer(&request) {
        Ok(result) => match output.render_result(frame, &result) {
          Ok(reaction) => {
            report.alerts += reaction.alerted as u64;
            match reaction.evidence {
              Evidence::Saved(_) => report.evidence_saved += 1,
              Evidence::Failed(e) => warn!("[StorageError] 保存告警帧失败: {}", e),
              Evidence::Skipped => {}
            }
          }
          Err(e) => warn!("第 {} 帧告警反应失败: {}", stats.frame_count(), e),
        },
        Err(e) => {
          report.failed_cycles += 1;
          warn!("[{}] 第 {} 帧推理失败，跳过: {}", e.kind(), stats.frame_count(), e);
        }
      }

      if let Some(t) = throughput {
        report.throughput_reports += 1;
        info!(
          "已运行 {:.2?}，共 {} 帧，平均帧率: {:.2} fps",
          t.elapsed, t.frame_count, t.fps
        );
      }

      if self.max_frames.is_some_and(|n| stats.frame_count() >= n) {
        info!("达到指定帧数 {}, 退出任务循环", stats.frame_count());
        break StopReason::FrameLimit;
      }

      if self.stop.wait(self.interval) {
        warn!("中断信号接收，退出任务循环");
        break StopReason::Interrupted;
      }
    };

    report.elapsed = stats.elapsed();
    Ok(reason)
  }
}

impl<I, M, O> Task<I, M, O> for MonitorTask
where
  I: FrameSource,
  M: Model,
  O: Render,
  O::Error: std::fmt::Display,
{
  type Output = RunReport;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, mut output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务，周期间隔 {:?}", self.interval);

    let mut report = RunReport {
      frame_count: 0,
      elapsed: Duration::ZERO,
      throughput_reports: 0,
      alerts: 0,
      evidence_saved: 0,
      failed_cycles: 0,
      stop_reason: StopReason::Interrupted,
    };
    let outcome = self.cycles(&mut input, &model, &mut output, &mut report);
    input.release();

    report.stop_reason = outcome?;
    info!(
      "任务完成，共处理 {} 帧，告警 {} 次，保存证据 {} 张",
      report.frame_count, report.alerts, report.evidence_saved
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stats_report_every_period() {
    let mut stats = RunStats::new(30);
    let reports: Vec<u64> = (0..65)
      .filter_map(|_| stats.record_frame())
      .map(|t| t.frame_count)
      .collect();
    assert_eq!(reports, vec![30, 60]);
    assert_eq!(stats.frame_count(), 65);
  }

  #[test]
  fn zero_period_is_clamped() {
    let mut stats = RunStats::new(0);
    assert!(stats.record_frame().is_some());
  }

  #[test]
  fn throughput_is_frames_over_elapsed() {
    let mut stats = RunStats::new(1);
    std::thread::sleep(Duration::from_millis(20));
    let t = stats.record_frame().unwrap();
    assert_eq!(t.frame_count, 1);
    assert!(t.fps > 0.0 && t.fps <= 1.0 / 0.02 + 1e-9);
  }
}
