// 该文件是 Qingxing （清醒） 项目的一部分。
// src/input.rs - 视频/图像输入
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

use thiserror::Error;

use crate::{FromUrl, frame::Frame};

/// 帧来源：按需采集一帧，退出时释放设备
pub trait FrameSource {
  fn acquire(&mut self) -> Result<Frame, CaptureError>;

  /// 释放底层设备。每条退出路径上都会被调用，重复调用无副作用。
  fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
  fn acquire(&mut self) -> Result<Frame, CaptureError> {
    (**self).acquire()
  }

  fn release(&mut self) {
    (**self).release()
  }
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::ImageFileInput;

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::V4lInput;

/// 打开输入源时的错误，对整个运行是致命的
#[derive(Error, Debug)]
pub enum InputError {
  #[error("设备不可用: {0}")]
  DeviceUnavailable(String),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的输入参数: {0}")]
  InvalidArgument(String),
}

/// 采集过程中的错误，发生后循环结束
#[derive(Error, Debug)]
pub enum CaptureError {
  #[error("采集失败: {0}")]
  CaptureFailed(String),
  #[error("输入已结束")]
  Exhausted,
}

pub enum InputWrapper {
  #[cfg(feature = "v4l_input")]
  V4l(V4lInput),
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
}

impl InputWrapper {
  /// 按设备序号打开摄像头
  #[cfg(feature = "v4l_input")]
  pub fn open_device(index: usize) -> Result<Self, InputError> {
    Ok(InputWrapper::V4l(V4lInput::open(index)?))
  }

  #[cfg(not(feature = "v4l_input"))]
  pub fn open_device(index: usize) -> Result<Self, InputError> {
    Err(InputError::DeviceUnavailable(format!(
      "未启用 v4l_input 特性，无法打开设备 {}",
      index
    )))
  }
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "v4l_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == V4lInput::SCHEME {
        return Ok(InputWrapper::V4l(V4lInput::from_url(url)?));
      }
    }
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        return Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?));
      }
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl FrameSource for InputWrapper {
  fn acquire(&mut self) -> Result<Frame, CaptureError> {
    match self {
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.acquire(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.acquire(),
      // 未启用任何输入特性时没有可用的变体
      #[allow(unreachable_patterns)]
      _ => Err(CaptureError::CaptureFailed("未启用任何输入特性".to_string())),
    }
  }

  fn release(&mut self) {
    match self {
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.release(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.release(),
      #[allow(unreachable_patterns)]
      _ => {}
    }
  }
}
