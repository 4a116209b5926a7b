// 该文件是 Qingxing （清醒） 项目的一部分。
// src/model.rs - 检测服务契约
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{encode::EncodedFrame, frame::Frame};

mod remote;
pub use self::remote::{DEFAULT_TIMEOUT, RemoteModel};

/// 疲劳检测模型。实际的分类在远端服务中完成。
pub trait Model {
  fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError>;
}

impl<M: Model + ?Sized> Model for &M {
  fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError> {
    (**self).infer(request)
  }
}

/// 每个周期新建的请求体
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
  pub image: String,
  pub timestamp: String,
}

impl InferenceRequest {
  pub fn new(encoded: &EncodedFrame, frame: &Frame) -> Self {
    Self {
      image: encoded.to_base64(),
      timestamp: frame.timestamp(),
    }
  }
}

/// 服务返回的单个目标框，坐标为像素 [x1, y1, x2, y2]
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
  #[serde(rename = "class")]
  pub label: String,
  #[serde(default)]
  pub confidence: f32,
  #[serde(rename = "box")]
  pub bbox: [f32; 4],
}

fn unknown_status() -> String {
  "Unknown".to_string()
}

/// `null` 或非字符串的 status 按缺省处理
fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(match Option::<Value>::deserialize(deserializer)? {
    Some(Value::String(status)) => status,
    _ => unknown_status(),
  })
}

/// `null` 视为缺省；其余非布尔值仍然是解析错误
fn nullable_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
  Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// 只保留形状正确的目标框，其余条目丢弃
fn lenient_detections<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Detection>, D::Error> {
  Ok(match Option::<Value>::deserialize(deserializer)? {
    Some(Value::Array(items)) => items
      .into_iter()
      .filter_map(|item| serde_json::from_value(item).ok())
      .collect(),
    _ => Vec::new(),
  })
}

/// 任何非 null 的 `error` 都算服务端错误，非字符串的值按 JSON 文本保留
fn in_band_error<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  Ok(match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => None,
    Some(Value::String(message)) => Some(message),
    Some(other) => Some(other.to_string()),
  })
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct InferenceResult {
  #[serde(default = "unknown_status", deserialize_with = "lenient_status")]
  pub status: String,
  #[serde(default, deserialize_with = "nullable_flag")]
  pub is_drowsy: bool,
  #[serde(default, deserialize_with = "lenient_detections")]
  pub detections: Vec<Detection>,
  /// 服务内部出错时会在 2xx 响应里带上 `error`
  #[serde(default, deserialize_with = "in_band_error")]
  pub error: Option<String>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, Value>,
}

impl Default for InferenceResult {
  fn default() -> Self {
    Self {
      status: unknown_status(),
      is_drowsy: false,
      detections: Vec::new(),
      error: None,
      extra: serde_json::Map::new(),
    }
  }
}

impl InferenceResult {
  pub fn drowsy(is_drowsy: bool) -> Self {
    Self {
      status: if is_drowsy { "Drowsy" } else { "Normal" }.to_string(),
      is_drowsy,
      ..Default::default()
    }
  }
}

/// 与检测服务交互时的错误，均只影响当前周期
#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("请求超时 ({0:?})")]
  Timeout(Duration),
  #[error("服务不可达: {0}")]
  Unreachable(String),
  #[error("服务返回错误 {code}: {body}")]
  ServerError { code: u16, body: String },
  #[error("响应解析失败: {0}")]
  DecodeError(String),
}

impl InferenceError {
  pub fn kind(&self) -> &'static str {
    match self {
      InferenceError::Timeout(_) => "Timeout",
      InferenceError::Unreachable(_) => "Unreachable",
      InferenceError::ServerError { .. } => "ServerError",
      InferenceError::DecodeError(_) => "DecodeError",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_take_defaults() {
    let result: InferenceResult = serde_json::from_str("{}").unwrap();
    assert_eq!(result.status, "Unknown");
    assert!(!result.is_drowsy);
    assert!(result.detections.is_empty());
    assert_eq!(result, InferenceResult::default());
  }

  #[test]
  fn extra_fields_are_kept_aside() {
    let result: InferenceResult = serde_json::from_str(
      r#"{"status": "Drowsy", "is_drowsy": true, "eye_ratio": 0.12,
          "detections": [{"class": "closed_eye", "confidence": 0.91, "box": [1, 2, 30, 40]}]}"#,
    )
    .unwrap();
    assert!(result.is_drowsy);
    assert_eq!(result.detections[0].label, "closed_eye");
    assert_eq!(result.detections[0].bbox, [1.0, 2.0, 30.0, 40.0]);
    assert!(result.extra.contains_key("eye_ratio"));
  }

  #[test]
  fn non_object_body_is_rejected() {
    assert!(serde_json::from_str::<InferenceResult>("[true]").is_err());
    assert!(serde_json::from_str::<InferenceResult>(r#"{"is_drowsy": "yes"}"#).is_err());
  }

  #[test]
  fn malformed_detections_keep_the_verdict() {
    for detections in [
      "null",
      r#"[{"class": "closed_eye", "confidence": 0.9, "box": [1, 2, 3]}]"#,
      r#"[{"class": "closed_eye", "box": {"x": 1, "y": 2}}]"#,
      r#""closed_eye""#,
    ] {
      let body = format!(
        r#"{{"status": "Drowsy", "is_drowsy": true, "detections": {}}}"#,
        detections
      );
      let result: InferenceResult = serde_json::from_str(&body).unwrap();
      assert!(result.is_drowsy, "{}", body);
      assert_eq!(result.status, "Drowsy");
      assert!(result.detections.is_empty(), "{}", body);
    }
  }

  #[test]
  fn bad_detection_entries_are_skipped() {
    let result: InferenceResult = serde_json::from_str(
      r#"{"is_drowsy": true, "detections": [
          {"class": "yawn", "box": [0, 0, 5]},
          {"class": "closed_eye", "confidence": 0.8, "box": [1, 2, 3, 4]}]}"#,
    )
    .unwrap();
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].label, "closed_eye");
  }

  #[test]
  fn null_fields_take_defaults() {
    let result: InferenceResult =
      serde_json::from_str(r#"{"status": null, "is_drowsy": null, "error": null}"#).unwrap();
    assert_eq!(result.status, "Unknown");
    assert!(!result.is_drowsy);
    assert!(result.error.is_none());

    let result: InferenceResult = serde_json::from_str(r#"{"status": 3, "is_drowsy": true}"#).unwrap();
    assert_eq!(result.status, "Unknown");
    assert!(result.is_drowsy);
  }

  #[test]
  fn non_string_error_is_kept_as_text() {
    let result: InferenceResult =
      serde_json::from_str(r#"{"is_drowsy": true, "error": 0}"#).unwrap();
    assert_eq!(result.error.as_deref(), Some("0"));

    let result: InferenceResult =
      serde_json::from_str(r#"{"error": {"code": 7}}"#).unwrap();
    assert_eq!(result.error.as_deref(), Some(r#"{"code":7}"#));
  }

  #[test]
  fn request_serializes_contract_fields() {
    let request = InferenceRequest {
      image: "AAEC".to_string(),
      timestamp: "2026-01-01T00:00:00.000000+08:00".to_string(),
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["image"], "AAEC");
    assert_eq!(value["timestamp"], "2026-01-01T00:00:00.000000+08:00");
  }
}
