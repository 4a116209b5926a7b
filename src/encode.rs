// 该文件是 Qingxing （清醒） 项目的一部分。
// src/encode.rs - 帧压缩编码
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

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ExtendedColorType, ImageEncoder, codecs::jpeg::JpegEncoder};
use thiserror::Error;

use crate::frame::Frame;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Error, Debug)]
pub enum EncodeError {
  #[error("JPEG 编码错误: {0}")]
  JpegError(#[from] image::ImageError),
}

/// 有损压缩后的帧，只在一次网络请求中存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
  bytes: Box<[u8]>,
  quality: u8,
}

impl EncodedFrame {
  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn quality(&self) -> u8 {
    self.quality
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// 适合放进 JSON 的 base64 文本
  pub fn to_base64(&self) -> String {
    STANDARD.encode(&self.bytes)
  }
}

/// 固定质量的 JPEG 编码器，整个运行期间质量不变
#[derive(Debug, Clone, Copy)]
pub struct JpegFrameEncoder {
  quality: u8,
}

impl Default for JpegFrameEncoder {
  fn default() -> Self {
    Self::new(DEFAULT_JPEG_QUALITY)
  }
}

impl JpegFrameEncoder {
  /// 质量取值 0-100；JPEG 编码器不接受 0，按 1 处理
  pub fn new(quality: u8) -> Self {
    Self {
      quality: quality.min(100),
    }
  }

  pub fn quality(&self) -> u8 {
    self.quality
  }

  pub fn encode(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
    let image = frame.image();
    let mut bytes = Vec::with_capacity(frame.width() * frame.height() / 4);
    JpegEncoder::new_with_quality(&mut bytes, self.quality.max(1)).write_image(
      image.as_raw(),
      image.width(),
      image.height(),
      ExtendedColorType::Rgb8,
    )?;

    Ok(EncodedFrame {
      bytes: bytes.into_boxed_slice(),
      quality: self.quality,
    })
  }
}
