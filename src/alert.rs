// 该文件是 Qingxing （清醒） 项目的一部分。
// src/alert.rs - 疲劳告警状态机
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

use crate::model::InferenceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
  #[default]
  Normal,
  Drowsy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: AlertState,
  pub to: AlertState,
}

impl Transition {
  pub fn is_alert(&self) -> bool {
    self.to == AlertState::Drowsy
  }

  pub fn entered_drowsy(&self) -> bool {
    self.from == AlertState::Normal && self.to == AlertState::Drowsy
  }

  pub fn cleared(&self) -> bool {
    self.from == AlertState::Drowsy && self.to == AlertState::Normal
  }
}

/// 何时保存证据帧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EvidencePolicy {
  /// 每个 is_drowsy=true 的结果都保存
  #[default]
  Every,
  /// 只在 Normal -> Drowsy 时保存
  Transition,
}

impl EvidencePolicy {
  pub fn should_save(&self, transition: &Transition) -> bool {
    match self {
      EvidencePolicy::Every => transition.is_alert(),
      EvidencePolicy::Transition => transition.entered_drowsy(),
    }
  }
}

/// 只由最近一次结果驱动，没有去抖，也没有超时恢复
#[derive(Debug, Default)]
pub struct AlertStateMachine {
  state: AlertState,
}

impl AlertStateMachine {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> AlertState {
    self.state
  }

  pub fn observe(&mut self, result: &InferenceResult) -> Transition {
    let from = self.state;
    self.state = if result.is_drowsy {
      AlertState::Drowsy
    } else {
      AlertState::Normal
    };
    Transition {
      from,
      to: self.state,
    }
  }
}
