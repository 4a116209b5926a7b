// 该文件是 Qingxing （清醒） 项目的一部分。
// src/frame.rs - 采集帧定义
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

use chrono::{DateTime, Local, SecondsFormat};
use image::RgbImage;

const RGB_CHANNELS: usize = 3;

/// 一次采集得到的 RGB 图像，附带采集时刻
///
/// 帧只属于当前循环周期；只有在进入告警时才会被拷贝给证据记录器。
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  captured_at: DateTime<Local>,
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Self::captured_now(image)
  }
}

impl Frame {
  pub fn new(image: RgbImage, captured_at: DateTime<Local>) -> Self {
    Self { image, captured_at }
  }

  pub fn captured_now(image: RgbImage) -> Self {
    Self::new(image, Local::now())
  }

  pub fn width(&self) -> usize {
    self.image.width() as usize
  }

  pub fn height(&self) -> usize {
    self.image.height() as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn into_image(self) -> RgbImage {
    self.image
  }

  pub fn captured_at(&self) -> DateTime<Local> {
    self.captured_at
  }

  /// ISO-8601 格式的采集时刻，精确到微秒
  pub fn timestamp(&self) -> String {
    self.captured_at.to_rfc3339_opts(SecondsFormat::Micros, false)
  }
}

impl AsRef<[u8]> for Frame {
  fn as_ref(&self) -> &[u8] {
    self.image.as_raw()
  }
}
