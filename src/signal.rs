// 该文件是 Qingxing （清醒） 项目的一部分。
// src/signal.rs - 中断信号
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

use std::{
  cell::Cell,
  sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
  thread,
  time::Duration,
};

use tracing::{info, warn};

/// 强制退出前等待循环收尾的时间
pub const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

/// 发送停止请求的一端
#[derive(Clone)]
pub struct StopHandle {
  tx: Sender<()>,
}

impl StopHandle {
  pub fn stop(&self) {
    let _ = self.tx.send(());
  }
}

/// 循环侧的停止信号，只在周期边界和休眠期间检查
pub struct StopSignal {
  rx: Receiver<()>,
  stopped: Cell<bool>,
}

impl StopSignal {
  pub fn new() -> (StopHandle, StopSignal) {
    let (tx, rx) = mpsc::channel();
    (
      StopHandle { tx },
      StopSignal {
        rx,
        stopped: Cell::new(false),
      },
    )
  }

  /// 注册 Ctrl-C 处理；收到信号后若 30 秒内仍未退出则强制结束进程
  pub fn install_ctrlc() -> Result<StopSignal, ctrlc::Error> {
    let (handle, signal) = Self::new();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      handle.stop();
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(signal)
  }

  pub fn is_stopped(&self) -> bool {
    if !self.stopped.get() && self.rx.try_recv().is_ok() {
      self.stopped.set(true);
    }
    self.stopped.get()
  }

  /// 休眠 `duration`，期间收到停止请求则立即返回 true
  pub fn wait(&self, duration: Duration) -> bool {
    if self.is_stopped() {
      return true;
    }
    match self.rx.recv_timeout(duration) {
      Ok(()) => {
        self.stopped.set(true);
        true
      }
      Err(RecvTimeoutError::Timeout) => false,
      // 所有发送端都已释放，不会再有停止请求
      Err(RecvTimeoutError::Disconnected) => {
        thread::sleep(duration);
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Instant;

  #[test]
  fn wait_times_out_without_request() {
    let (_handle, signal) = StopSignal::new();
    let started = Instant::now();
    assert!(!signal.wait(Duration::from_millis(20)));
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert!(!signal.is_stopped());
  }

  #[test]
  fn stop_interrupts_sleep() {
    let (handle, signal) = StopSignal::new();
    let sender = thread::spawn(move || {
      thread::sleep(Duration::from_millis(30));
      handle.stop();
    });

    let started = Instant::now();
    assert!(signal.wait(Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(signal.is_stopped());
    sender.join().unwrap();
  }

  #[test]
  fn stop_is_sticky() {
    let (handle, signal) = StopSignal::new();
    handle.stop();
    assert!(signal.is_stopped());
    assert!(signal.is_stopped());
    assert!(signal.wait(Duration::from_secs(10)));
  }

  #[test]
  fn dropped_handle_still_sleeps() {
    let (handle, signal) = StopSignal::new();
    drop(handle);
    let started = Instant::now();
    assert!(!signal.wait(Duration::from_millis(20)));
    assert!(started.elapsed() >= Duration::from_millis(20));
  }
}
