// 该文件是 Qingxing （清醒） 项目的一部分。
// src/output/draw.rs - 告警标记与检测框绘制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ab_glyph::{FontVec, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::model::Detection;

pub const ALERT_TEXT: &str = "DROWSINESS ALERT!";

// 文本渲染常量
const ALERT_FONT_SIZE: f32 = 28.0;
const ALERT_BANNER_HEIGHT: u32 = 40;
const ALERT_BORDER: u32 = 6;
const ALERT_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_COLOR: [u8; 3] = [255, 160, 0]; // 橙色
const TEXT_COLOR: [u8; 3] = [255, 255, 255];

/// 在告警帧上绘制固定的告警标记
///
/// 没有字体时只画红框和横幅，不写文字。
pub struct AlertOverlay {
  font: Option<FontVec>,
  color: [u8; 3],
  label_color: [u8; 3],
}

impl Default for AlertOverlay {
  fn default() -> Self {
    Self {
      font: None,
      color: ALERT_COLOR,
      label_color: LABEL_COLOR,
    }
  }
}

impl AlertOverlay {
  pub fn with_font(font_data: Vec<u8>) -> Result<Self, InvalidFont> {
    let font = FontVec::try_from_vec(font_data)?;
    Ok(Self {
      font: Some(font),
      ..Default::default()
    })
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 红色边框 + 顶部横幅
  pub fn mark_alert(&self, image: &mut RgbImage) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
      return;
    }
    let color = Rgb(self.color);

    for t in 0..ALERT_BORDER.min(w / 2).min(h / 2) {
      let rect = Rect::at(t as i32, t as i32).of_size(w - 2 * t, h - 2 * t);
      draw_hollow_rect_mut(image, rect, color);
    }

    let banner_height = ALERT_BANNER_HEIGHT.min(h);
    draw_filled_rect_mut(image, Rect::at(0, 0).of_size(w, banner_height), color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        Rgb(TEXT_COLOR),
        10,
        6,
        PxScale::from(ALERT_FONT_SIZE),
        font,
        ALERT_TEXT,
      );
    }
  }

  /// 绘制服务返回的检测框，坐标为像素 [x1, y1, x2, y2]
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      self.draw_bbox_with_label(image, detection);
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w < 2 || h < 2 {
      return;
    }
    let bbox = &detection.bbox;

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.label_color);
    // 边框加粗为 2 像素
    for t in 0..2 {
      let (box_w, box_h) = (x_max - x_min - 2 * t, y_max - y_min - 2 * t);
      if box_w <= 0 || box_h <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(box_w as u32 + 1, box_h as u32 + 1);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", detection.label, detection.confidence);
    let text_width = (label.len() as f32 * LABEL_CHAR_WIDTH) as i32;

    // 标签放在边框上方，并限制在图像内
    let label_x = x_min;
    let label_y = (y_min - LABEL_TEXT_HEIGHT).max(0);
    let label_width = text_width.min(w - label_x);

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width as u32, LABEL_TEXT_HEIGHT as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb(TEXT_COLOR),
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        PxScale::from(LABEL_FONT_SIZE),
        font,
        &label,
      );
    }
  }
}
