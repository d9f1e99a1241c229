//! バウンディングボックスの描画
//!
//! - 注釈付き画像: 全ボックスを赤・3px で描画して JPEG 保存
//! - 表示用画像: 選択中のボックスを青で描き直し、左上に信頼度を添える

use crate::config::{RenderConfig, BOX_COLOR, HIGHLIGHT_COLOR};
use crate::error::{PhytoscopeError, Result};
use crate::session::RenderSpec;
use ab_glyph::{FontVec, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use phytoscope_common::{BBox, Detection};
use std::path::Path;

pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)
        .map_err(|e| PhytoscopeError::ImageLoad(format!("{}: {}", path.display(), e)))?;
    Ok(image.to_rgb8())
}

/// 矩形を `width` px の枠線で描画（内側に太らせる）
pub fn draw_box(image: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, width: u32) {
    for i in 0..width.max(1) as i32 {
        let w = bbox.xmax - bbox.xmin + 1 - 2 * i;
        let h = bbox.ymax - bbox.ymin + 1 - 2 * i;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(bbox.xmin + i, bbox.ymin + i).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

pub fn draw_detections(image: &mut RgbImage, detections: &[Detection], width: u32) {
    for det in detections {
        draw_box(image, &det.bbox, Rgb(BOX_COLOR), width);
    }
}

/// 注釈付き画像を生成して保存
pub fn write_annotated_image(
    source: &Path,
    detections: &[Detection],
    width: u32,
    dest: &Path,
) -> Result<()> {
    let mut image = load_rgb(source)?;
    draw_detections(&mut image, detections, width);
    image.save_with_format(dest, ImageFormat::Jpeg)?;
    Ok(())
}

/// `max_w x max_h` に収まる縮小サイズ（拡大はしない）
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

pub struct Renderer {
    config: RenderConfig,
    font: Option<FontVec>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        let font = match &config.font_path {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                let font = FontVec::try_from_vec(bytes).map_err(|e| {
                    PhytoscopeError::Config(format!("フォントを読み込めません {}: {}", path.display(), e))
                })?;
                Some(font)
            }
            None => None,
        };
        Ok(Self { config, font })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 表示状態を画像に描画
    pub fn render(&self, spec: &RenderSpec) -> Result<RgbImage> {
        let mut image = load_rgb(&spec.source)?;
        draw_detections(&mut image, &spec.detections, self.config.box_width);

        if let Some(det) = spec.highlighted_detection() {
            draw_box(&mut image, &det.bbox, Rgb(HIGHLIGHT_COLOR), self.config.box_width);
            if let Some(font) = &self.font {
                let text = format!("{:.2}", det.confidence);
                draw_text_mut(
                    &mut image,
                    Rgb(HIGHLIGHT_COLOR),
                    det.bbox.xmin,
                    det.bbox.ymin,
                    PxScale::from(self.config.font_size),
                    font,
                    &text,
                );
            }
        }

        let (w, h) = fit_within(
            image.width(),
            image.height(),
            self.config.display_width,
            self.config.display_height,
        );
        if (w, h) != image.dimensions() {
            image = image::imageops::thumbnail(&image, w, h);
        }
        Ok(image)
    }

    pub fn render_to_file(&self, spec: &RenderSpec, dest: &Path) -> Result<()> {
        let image = self.render(spec)?;
        image.save(dest)?;
        Ok(())
    }
}
