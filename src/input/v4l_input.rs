// 该文件是 Qingxing （清醒） 项目的一部分。
// src/input/v4l_input.rs - V4L 摄像头输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::pin::Pin;

use image::RgbImage;
use tracing::{error, info};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{
  FromUrl, FromUrlWithScheme, decode_url_path,
  frame::Frame,
  input::{CaptureError, FrameSource, InputError},
};

const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;
const CAPTURE_BUFFERS: u32 = 4;

/// V4L 摄像头输入源
///
/// v4l 的 Stream 需要引用 Device，因此 Device 放在 Pin<Box> 里保证地址稳定。
pub struct V4lInput {
  stream: Option<Stream<'static>>,
  device: Option<Pin<Box<Device>>>,
  width: u32,
  height: u32,
  stride: u32,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = InputError;

  // v4l:///dev/video0
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = match decode_url_path(url) {
      path if path.is_empty() || path == "/" => "/dev/video0".to_string(),
      path => path,
    };
    let device = Device::with_path(&path)
      .map_err(|e| InputError::DeviceUnavailable(format!("{}: {}", path, e)))?;
    Self::with_device(device, &path)
  }
}

impl V4lInput {
  /// 按序号打开 `/dev/video<index>`
  pub fn open(index: usize) -> Result<Self, InputError> {
    let device = Device::new(index)
      .map_err(|e| InputError::DeviceUnavailable(format!("/dev/video{}: {}", index, e)))?;
    Self::with_device(device, &format!("/dev/video{}", index))
  }

  fn with_device(device: Device, name: &str) -> Result<Self, InputError> {
    let unavailable = |e: std::io::Error| InputError::DeviceUnavailable(format!("{}: {}", name, e));
    let device = Box::pin(device);

    let mut format = device.format().map_err(unavailable)?;
    format.width = CAPTURE_WIDTH;
    format.height = CAPTURE_HEIGHT;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format).map_err(unavailable)?;
    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(InputError::DeviceUnavailable(format!(
        "{}: 不支持的像素格式 {}",
        name, format.fourcc
      )));
    }

    // SAFETY: device 被 Pin<Box> 固定在堆上，不会移动；
    // stream 在 release/drop 中总是先于 device 被释放
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(&*device);
      Stream::with_buffers(device_static, Type::VideoCapture, CAPTURE_BUFFERS)
        .map_err(unavailable)?
    };

    info!(
      "摄像头已打开: {} {}x{} (行步长 {})",
      name, format.width, format.height, format.stride
    );
    Ok(Self {
      stream: Some(stream),
      device: Some(device),
      width: format.width,
      height: format.height,
      stride: format.stride,
    })
  }
}

/// 将 YUYV 格式转换为 RGB
///
/// `stride` 为驱动报告的每行字节数，行尾的填充字节会被跳过；
/// 为 0 时按紧密排列处理。缓冲区不足一帧时返回 `None`。
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32, stride: u32) -> Option<Vec<u8>> {
  let row_bytes = width as usize * 2;
  let stride = (stride as usize).max(row_bytes);
  let mut rgb = Vec::with_capacity((width * height * 3) as usize);

  for row in 0..height as usize {
    let row_start = row * stride;
    let line = yuyv.get(row_start..row_start + row_bytes)?;

    for chunk in line.chunks_exact(4) {
      let y0 = chunk[0] as f32;
      let u = chunk[1] as f32 - 128.0;
      let y1 = chunk[2] as f32;
      let v = chunk[3] as f32 - 128.0;

      for y in [y0, y1] {
        let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
        let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
        rgb.extend_from_slice(&[r, g, b]);
      }
    }
  }

  Some(rgb)
}

impl FrameSource for V4lInput {
  fn acquire(&mut self) -> Result<Frame, CaptureError> {
    let stream = self
      .stream
      .as_mut()
      .ok_or_else(|| CaptureError::CaptureFailed("设备已释放".to_string()))?;

    let (buffer, _meta) = stream
      .next()
      .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    let rgb = yuyv_to_rgb(buffer, self.width, self.height, self.stride).ok_or_else(|| {
      CaptureError::CaptureFailed(format!(
        "缓冲区过短: {} 字节, 需要 {}x{} (行步长 {})",
        buffer.len(),
        self.width,
        self.height,
        self.stride
      ))
    })?;

    RgbImage::from_raw(self.width, self.height, rgb)
      .map(Frame::captured_now)
      .ok_or_else(|| CaptureError::CaptureFailed("缓冲区大小与分辨率不匹配".to_string()))
  }

  fn release(&mut self) {
    if self.stream.take().is_some() {
      info!("释放摄像头");
    }
    self.device.take();
  }
}

impl Drop for V4lInput {
  fn drop(&mut self) {
    self.release();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yuyv_grey_maps_to_grey() {
    let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1, 4).unwrap();
    assert_eq!(rgb, vec![128, 128, 128, 128, 128, 128]);
  }

  #[test]
  fn yuyv_ignores_trailing_bytes() {
    let rgb = yuyv_to_rgb(&[0, 128, 255, 128, 7], 2, 1, 0).unwrap();
    assert_eq!(rgb.len(), 6);
    assert_eq!(&rgb[..3], &[0, 0, 0]);
    assert_eq!(&rgb[3..], &[255, 255, 255]);
  }

  #[test]
  fn yuyv_skips_row_padding() {
    // 每行 4 字节像素 + 4 字节填充
    let yuyv = [
      0, 128, 0, 128, 9, 9, 9, 9, //
      255, 128, 255, 128, 9, 9, 9, 9,
    ];
    let rgb = yuyv_to_rgb(&yuyv, 2, 2, 8).unwrap();
    assert_eq!(rgb.len(), 12);
    assert!(rgb[..6].iter().all(|&c| c == 0));
    assert!(rgb[6..].iter().all(|&c| c == 255));
  }

  #[test]
  fn yuyv_short_buffer_is_rejected() {
    // 两行、步长 8，但只有 12 字节
    assert!(yuyv_to_rgb(&[128; 12], 2, 2, 8).is_none());
    assert!(yuyv_to_rgb(&[128; 4], 2, 2, 0).is_none());
  }
}
