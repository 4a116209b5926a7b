// 该文件是 Qingxing （清醒） 项目的一部分。
// src/output/evidence.rs - 告警证据保存
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode_url_path};

pub const DEFAULT_EVIDENCE_DIR: &str = "drowsiness_captures";

#[derive(Error, Debug)]
pub enum StorageError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 把告警帧按秒级时间戳写入目录
///
/// 文件名为 `drowsy_YYYYMMDD_HHMMSS.jpg`，同一秒内的多次保存会互相覆盖。
pub struct EvidenceRecorder {
  directory: PathBuf,
}

impl FromUrlWithScheme for EvidenceRecorder {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for EvidenceRecorder {
  type Error = StorageError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(StorageError::SchemeMismatch);
    }
    Ok(Self::new(decode_url_path(uri)))
  }
}

impl EvidenceRecorder {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn file_name(timestamp: &DateTime<Local>) -> String {
    format!("drowsy_{}.jpg", timestamp.format("%Y%m%d_%H%M%S"))
  }

  pub fn save(&self, image: &RgbImage, timestamp: &DateTime<Local>) -> Result<PathBuf, StorageError> {
    if !self.directory.exists() {
      std::fs::create_dir_all(&self.directory)?;
    }

    let path = self.directory.join(Self::file_name(timestamp));
    image.save_with_format(&path, ImageFormat::Jpeg)?;
    warn!("已保存告警帧: {}", path.display());

    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use image::Rgb;

  fn at(second: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 7, 9, 14, 5, second).unwrap()
  }

  #[test]
  fn file_name_has_second_granularity() {
    assert_eq!(
      EvidenceRecorder::file_name(&at(7)),
      "drowsy_20260709_140507.jpg"
    );
  }

  #[test]
  fn saves_into_created_directory() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = EvidenceRecorder::new(dir.path().join("nested/captures"));

    let path = recorder.save(&RgbImage::new(16, 16), &at(1)).unwrap();
    assert!(path.exists());
    assert_eq!(
      image::ImageFormat::from_path(&path).unwrap(),
      ImageFormat::Jpeg
    );
  }

  #[test]
  fn same_second_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = EvidenceRecorder::new(dir.path());

    let first = recorder
      .save(&RgbImage::from_pixel(16, 16, Rgb([0, 0, 0])), &at(3))
      .unwrap();
    let second = recorder
      .save(&RgbImage::from_pixel(16, 16, Rgb([255, 255, 255])), &at(3))
      .unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    let saved = image::open(&second).unwrap().to_rgb8();
    assert!(saved.get_pixel(8, 8)[0] > 200);
  }

  #[test]
  fn unwritable_directory_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let recorder = EvidenceRecorder::new(blocker.join("captures"));
    assert!(recorder.save(&RgbImage::new(4, 4), &at(0)).is_err());
  }

  #[test]
  fn from_folder_url() {
    let url = Url::parse("folder:///var/tmp/drowsy%20shots").unwrap();
    let recorder = EvidenceRecorder::from_url(&url).unwrap();
    assert_eq!(recorder.directory(), Path::new("/var/tmp/drowsy shots"));
  }
}
