// 该文件是 Qingxing （清醒） 项目的一部分。
// src/model/remote.rs - 远程检测服务客户端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{error::Error as _, io, time::Duration};

use tracing::debug;
use url::Url;

use crate::model::{InferenceError, InferenceRequest, InferenceResult, Model};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 通过 HTTP POST 把帧交给检测服务
///
/// 请求体为 `{"image": <base64>, "timestamp": <ISO-8601>}`，响应为 JSON。
/// 不做重试，每次调用最多阻塞 `timeout`。
pub struct RemoteModel {
  agent: ureq::Agent,
  endpoint: Url,
  timeout: Duration,
}

impl RemoteModel {
  pub fn new(endpoint: &Url, timeout: Duration) -> Self {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    Self {
      agent,
      endpoint: endpoint.clone(),
      timeout,
    }
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  fn classify_io(&self, err: &io::Error) -> InferenceError {
    match err.kind() {
      io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => InferenceError::Timeout(self.timeout),
      _ => InferenceError::Unreachable(err.to_string()),
    }
  }

  fn classify_transport(&self, transport: ureq::Transport) -> InferenceError {
    let mut source = transport.source();
    while let Some(err) = source {
      if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return self.classify_io(io_err);
      }
      source = err.source();
    }

    let message = transport.to_string();
    if message.contains("timed out") {
      InferenceError::Timeout(self.timeout)
    } else {
      InferenceError::Unreachable(message)
    }
  }
}

impl Model for RemoteModel {
  fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError> {
    debug!(
      "发送帧到 {} ({} 字节 base64)",
      self.endpoint,
      request.image.len()
    );

    let response = self
      .agent
      .post(self.endpoint.as_str())
      .send_json(request)
      .map_err(|e| match e {
        ureq::Error::Status(code, response) => InferenceError::ServerError {
          code,
          body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => self.classify_transport(transport),
      })?;

    let code = response.status();
    let body = response.into_string().map_err(|e| self.classify_io(&e))?;
    if !(200..300).contains(&code) {
      return Err(InferenceError::ServerError { code, body });
    }

    let result: InferenceResult =
      serde_json::from_str(&body).map_err(|e| InferenceError::DecodeError(e.to_string()))?;
    if let Some(message) = result.error {
      return Err(InferenceError::ServerError {
        code,
        body: message,
      });
    }

    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{BufRead, BufReader, Read, Write};
  use std::net::TcpListener;
  use std::sync::mpsc;
  use std::thread;

  fn request() -> InferenceRequest {
    InferenceRequest {
      image: "/9j/AA==".to_string(),
      timestamp: "2026-05-04T10:20:30.000000+00:00".to_string(),
    }
  }

  /// 只应答一次的本地 HTTP 服务，返回收到的请求体
  fn serve_once(
    status: &'static str,
    body: &'static str,
    delay: Duration,
  ) -> (Url, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = Url::parse(&format!("http://{}/detect", listener.local_addr().unwrap())).unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
      let (stream, _) = listener.accept().unwrap();
      let mut reader = BufReader::new(stream);
      let mut content_length = 0;
      loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
          break;
        }
        if let Some((name, value)) = line.split_once(':')
          && name.eq_ignore_ascii_case("content-length")
        {
          content_length = value.trim().parse().unwrap();
        }
      }
      let mut payload = vec![0u8; content_length];
      reader.read_exact(&mut payload).unwrap();
      let _ = tx.send(String::from_utf8(payload).unwrap());

      thread::sleep(delay);
      let mut stream = reader.into_inner();
      let _ = write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
    });

    (url, rx)
  }

  #[test]
  fn posts_image_and_timestamp() {
    let (url, rx) = serve_once(
      "200 OK",
      r#"{"status": "Normal", "is_drowsy": false}"#,
      Duration::ZERO,
    );
    let model = RemoteModel::new(&url, DEFAULT_TIMEOUT);

    let result = model.infer(&request()).unwrap();
    assert_eq!(result.status, "Normal");
    assert!(!result.is_drowsy);

    let sent: serde_json::Value = serde_json::from_str(&rx.recv().unwrap()).unwrap();
    assert_eq!(sent["image"], "/9j/AA==");
    assert_eq!(sent["timestamp"], "2026-05-04T10:20:30.000000+00:00");
  }

  #[test]
  fn missing_fields_default() {
    let (url, _rx) = serve_once("200 OK", r#"{"confidence": 0.3}"#, Duration::ZERO);
    let result = RemoteModel::new(&url, DEFAULT_TIMEOUT)
      .infer(&request())
      .unwrap();
    assert_eq!(result.status, "Unknown");
    assert!(!result.is_drowsy);
  }

  #[test]
  fn non_success_is_server_error() {
    let (url, _rx) = serve_once("500 Internal Server Error", "model crashed", Duration::ZERO);
    match RemoteModel::new(&url, DEFAULT_TIMEOUT).infer(&request()) {
      Err(InferenceError::ServerError { code, body }) => {
        assert_eq!(code, 500);
        assert_eq!(body, "model crashed");
      }
      other => panic!("unexpected: {:?}", other),
    }
  }

  #[test]
  fn in_band_error_is_server_error() {
    let (url, _rx) = serve_once("200 OK", r#"{"error": "cannot decode image"}"#, Duration::ZERO);
    let err = RemoteModel::new(&url, DEFAULT_TIMEOUT)
      .infer(&request())
      .unwrap_err();
    assert_eq!(err.kind(), "ServerError");
    assert!(err.to_string().contains("cannot decode image"));
  }

  #[test]
  fn drowsy_verdict_survives_malformed_detections() {
    let (url, _rx) = serve_once(
      "200 OK",
      r#"{"status": "Drowsy", "is_drowsy": true, "error": null,
          "detections": [{"class": "closed_eye", "confidence": 0.9, "box": [1, 2, 3]}]}"#,
      Duration::ZERO,
    );
    let result = RemoteModel::new(&url, DEFAULT_TIMEOUT)
      .infer(&request())
      .unwrap();
    assert!(result.is_drowsy);
    assert_eq!(result.status, "Drowsy");
    assert!(result.detections.is_empty());
  }

  #[test]
  fn garbage_body_is_decode_error() {
    let (url, _rx) = serve_once("200 OK", "<html>oops</html>", Duration::ZERO);
    let err = RemoteModel::new(&url, DEFAULT_TIMEOUT)
      .infer(&request())
      .unwrap_err();
    assert!(matches!(err, InferenceError::DecodeError(_)), "{:?}", err);
  }

  #[test]
  fn slow_service_times_out() {
    let (url, _rx) = serve_once("200 OK", "{}", Duration::from_secs(3));
    let timeout = Duration::from_millis(300);
    let started = std::time::Instant::now();
    let err = RemoteModel::new(&url, timeout)
      .infer(&request())
      .unwrap_err();
    assert!(matches!(err, InferenceError::Timeout(_)), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(3));
  }

  #[test]
  fn closed_port_is_unreachable() {
    let port = {
      let listener = TcpListener::bind("127.0.0.1:0").unwrap();
      listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{}/detect", port)).unwrap();
    let err = RemoteModel::new(&url, DEFAULT_TIMEOUT)
      .infer(&request())
      .unwrap_err();
    assert!(matches!(err, InferenceError::Unreachable(_)), "{:?}", err);
  }
}
