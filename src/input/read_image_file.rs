// 该文件是 Qingxing （清醒） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{ImageReader, RgbImage};
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decode_url_path,
  frame::Frame,
  input::{CaptureError, FrameSource, InputError},
};

/// 将一张静态图片重复输出若干次，之后报告输入结束。
///
/// URL 格式: `image:///path/to/face.jpg?repeat=35`，`repeat` 缺省为 1。
pub struct ImageFileInput {
  image: Option<RgbImage>,
  remaining: usize,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    let mut repeat = 1;
    for (k, v) in url.query_pairs() {
      if k == "repeat" {
        repeat = v
          .parse()
          .map_err(|_| InputError::InvalidArgument(format!("repeat={}", v)))?;
      }
    }

    let path = decode_url_path(url);
    let image = ImageReader::open(&path)
      .map_err(|e| InputError::DeviceUnavailable(format!("{}: {}", path, e)))?
      .decode()?;
    debug!("已加载图像 {} ({}x{})", path, image.width(), image.height());

    Ok(Self::with_repeat(image.to_rgb8(), repeat))
  }
}

impl ImageFileInput {
  pub fn with_repeat(image: RgbImage, repeat: usize) -> Self {
    Self {
      image: Some(image),
      remaining: repeat,
    }
  }
}

impl FrameSource for ImageFileInput {
  fn acquire(&mut self) -> Result<Frame, CaptureError> {
    if self.remaining == 0 {
      return Err(CaptureError::Exhausted);
    }
    let image = self.image.as_ref().ok_or(CaptureError::Exhausted)?;
    self.remaining -= 1;
    Ok(Frame::captured_now(image.clone()))
  }

  fn release(&mut self) {
    self.image.take();
    self.remaining = 0;
  }
}
