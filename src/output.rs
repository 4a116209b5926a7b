// 该文件是 Qingxing （清醒） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{convert::Infallible, path::{Path, PathBuf}};

use tracing::{info, warn};

use crate::{
  alert::{AlertState, AlertStateMachine, EvidencePolicy},
  frame::Frame,
  model::InferenceResult,
};

pub mod draw;
mod evidence;

pub use self::draw::AlertOverlay;
pub use self::evidence::{DEFAULT_EVIDENCE_DIR, EvidenceRecorder, StorageError};

/// 对一次推理结果做出本地反应
pub trait Render {
  type Error;
  fn render_result(&mut self, frame: Frame, result: &InferenceResult) -> Result<Reaction, Self::Error>;
}

/// 告警帧的保存结果
#[derive(Debug)]
pub enum Evidence {
  Skipped,
  Saved(PathBuf),
  Failed(StorageError),
}

impl Evidence {
  pub fn path(&self) -> Option<&Path> {
    match self {
      Evidence::Saved(path) => Some(path),
      _ => None,
    }
  }
}

/// 一个周期的反应结果。保存失败不影响告警本身
#[derive(Debug)]
pub struct Reaction {
  pub state: AlertState,
  pub alerted: bool,
  pub evidence: Evidence,
}

/// 状态机 + 告警标记 + 证据保存
pub struct AlertResponder {
  machine: AlertStateMachine,
  overlay: AlertOverlay,
  recorder: Option<EvidenceRecorder>,
  policy: EvidencePolicy,
}

impl AlertResponder {
  pub fn new(overlay: AlertOverlay, recorder: Option<EvidenceRecorder>, policy: EvidencePolicy) -> Self {
    Self {
      machine: AlertStateMachine::new(),
      overlay,
      recorder,
      policy,
    }
  }

  pub fn state(&self) -> AlertState {
    self.machine.state()
  }
}

impl Render for AlertResponder {
  type Error = Infallible;

  /// 状态总会先更新；保存失败记录在 `Reaction::evidence` 中
  fn render_result(&mut self, frame: Frame, result: &InferenceResult) -> Result<Reaction, Self::Error> {
    let transition = self.machine.observe(result);

    if transition.cleared() {
      info!("疲劳状态解除: {}", result.status);
    }

    if !transition.is_alert() {
      return Ok(Reaction {
        state: transition.to,
        alerted: false,
        evidence: Evidence::Skipped,
      });
    }

    warn!("检测到疲劳! 状态: {}", result.status);

    let captured_at = frame.captured_at();
    let mut image = frame.into_image();
    self.overlay.mark_alert(&mut image);
    self.overlay.draw_detections(&mut image, &result.detections);

    let evidence = match &self.recorder {
      Some(recorder) if self.policy.should_save(&transition) => match recorder.save(&image, &captured_at) {
        Ok(path) => Evidence::Saved(path),
        Err(e) => Evidence::Failed(e),
      },
      _ => Evidence::Skipped,
    };

    Ok(Reaction {
      state: transition.to,
      alerted: true,
      evidence,
    })
  }
}
