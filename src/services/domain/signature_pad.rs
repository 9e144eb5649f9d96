/// 电子签名板
///
/// 将鼠标/触控笔画绘制到 RGBA 点阵上，提供"是否空白"与"匯出 PNG data URI"。
/// 点阵的实际尺寸 = 画布 CSS 尺寸 × 设备像素比（至少 1 像素），
/// 输入坐标以 CSS 像素计，绘制时换算为点阵像素。

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::debug;

use crate::utils::config::SignatureConfig;
use crate::utils::error::{AppError, AppResult};

/// PNG data URI 前缀
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// 指针位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerPosition {
    /// 鼠标事件：相对画布的偏移（CSS 像素）
    Mouse { offset_x: f64, offset_y: f64 },
    /// 触控事件：视窗坐标加上画布的边界矩形
    Touch {
        client_x: f64,
        client_y: f64,
        rect_left: f64,
        rect_top: f64,
    },
}

impl PointerPosition {
    /// 相对画布的 CSS 坐标
    fn css_point(&self) -> (f64, f64) {
        match *self {
            PointerPosition::Mouse { offset_x, offset_y } => (offset_x, offset_y),
            PointerPosition::Touch { client_x, client_y, rect_left, rect_top } => {
                (client_x - rect_left, client_y - rect_top)
            }
        }
    }
}

/// 签名板
#[derive(Debug, Clone)]
pub struct SignaturePad {
    css_width: u32,
    css_height: u32,
    ratio: f64,
    line_width_css: f64,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// 当前笔画的上一个点（点阵坐标），None 表示没有进行中的笔画
    last_point: Option<(f64, f64)>,
}

/// 设备像素比至少为 1
fn effective_ratio(device_pixel_ratio: f64) -> f64 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 1.0 {
        device_pixel_ratio
    } else {
        1.0
    }
}

fn backing_size(css: u32, ratio: f64) -> u32 {
    ((css as f64) * ratio).floor().max(1.0) as u32
}

impl SignaturePad {
    /// 按画布 CSS 尺寸与设备像素比创建
    pub fn new(viewport_width: u32, viewport_height: u32, device_pixel_ratio: f64) -> Self {
        let ratio = effective_ratio(device_pixel_ratio);
        let width = backing_size(viewport_width, ratio);
        let height = backing_size(viewport_height, ratio);
        Self {
            css_width: viewport_width,
            css_height: viewport_height,
            ratio,
            line_width_css: 2.0,
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            last_point: None,
        }
    }

    /// 按配置创建
    pub fn from_config(config: &SignatureConfig) -> Self {
        let mut pad = Self::new(config.viewport_width, config.viewport_height, config.device_pixel_ratio);
        if config.line_width.is_finite() && config.line_width > 0.0 {
            pad.line_width_css = config.line_width;
        }
        pad
    }

    /// 点阵宽度（像素）
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 点阵高度（像素）
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 实际使用的像素比
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// 是否有进行中的笔画
    pub fn is_drawing(&self) -> bool {
        self.last_point.is_some()
    }

    /// CSS 坐标换算为点阵坐标
    fn to_backing(&self, position: PointerPosition) -> (f64, f64) {
        let (x, y) = position.css_point();
        let scale_x = if self.css_width > 0 { self.width as f64 / self.css_width as f64 } else { self.ratio };
        let scale_y = if self.css_height > 0 { self.height as f64 / self.css_height as f64 } else { self.ratio };
        (x * scale_x, y * scale_y)
    }

    /// 开始一笔（不绘制任何像素）；已有进行中的笔画时重新开始
    pub fn start_stroke(&mut self, position: PointerPosition) {
        let point = self.to_backing(position);
        self.last_point = Some(point);
    }

    /// 延伸笔画：从上一个点画线段到当前点；没有进行中的笔画时忽略
    pub fn extend_stroke(&mut self, position: PointerPosition) {
        let Some(from) = self.last_point else {
            return;
        };
        let to = self.to_backing(position);
        self.draw_segment(from, to);
        self.last_point = Some(to);
    }

    /// 结束笔画
    pub fn end_stroke(&mut self) {
        self.last_point = None;
    }

    /// 以圆头黑色线段填充像素
    fn draw_segment(&mut self, from: (f64, f64), to: (f64, f64)) {
        let radius = self.line_width_css * self.ratio / 2.0;
        let min_x = (from.0.min(to.0) - radius).floor().max(0.0) as i64;
        let max_x = (from.0.max(to.0) + radius).ceil().min(self.width as f64 - 1.0) as i64;
        let min_y = (from.1.min(to.1) - radius).floor().max(0.0) as i64;
        let max_y = (from.1.max(to.1) + radius).ceil().min(self.height as f64 - 1.0) as i64;
        if min_x > max_x || min_y > max_y {
            return;
        }

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let center = (px as f64 + 0.5, py as f64 + 0.5);
                if distance_to_segment(center, from, to) <= radius {
                    let idx = ((py as usize) * (self.width as usize) + px as usize) * 4;
                    self.pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
                }
            }
        }
    }

    /// 与同尺寸的空白点阵比较
    pub fn is_blank(&self) -> bool {
        let blank = vec![0u8; self.pixels.len()];
        self.pixels == blank
    }

    /// 清空点阵，保留像素比
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|b| *b = 0);
    }

    /// 画布尺寸变化：重建点阵，原有签名与进行中的笔画都会丢失
    pub fn resize(&mut self, viewport_width: u32, viewport_height: u32) {
        self.css_width = viewport_width;
        self.css_height = viewport_height;
        self.width = backing_size(viewport_width, self.ratio);
        self.height = backing_size(viewport_height, self.ratio);
        self.pixels = vec![0; (self.width as usize) * (self.height as usize) * 4];
        self.last_point = None;
        debug!("[SignaturePad] 画布重设为 {}x{}", self.width, self.height);
    }

    /// 匯出为 PNG data URI
    pub fn export_image(&self) -> AppResult<String> {
        encode_png_data_uri(self.width, self.height, &self.pixels)
    }

    /// 同尺寸空白点阵的匯出结果
    pub fn blank_reference_image(&self) -> AppResult<String> {
        let blank = vec![0u8; self.pixels.len()];
        encode_png_data_uri(self.width, self.height, &blank)
    }
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// RGBA 点阵编码为 PNG 并转为 data URI
fn encode_png_data_uri(width: u32, height: u32, rgba: &[u8]) -> AppResult<String> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba)?;
        writer.finish()?;
    }
    Ok(format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(&buf)))
}

/// 检查字符串是否为合法的 PNG data URI（可解码且带 PNG 文件头）
pub fn is_png_data_uri(value: &str) -> bool {
    let Some(payload) = value.strip_prefix(PNG_DATA_URI_PREFIX) else {
        return false;
    };
    match STANDARD.decode(payload) {
        Ok(bytes) => bytes.starts_with(&PNG_SIGNATURE),
        Err(_) => false,
    }
}

/// 解码 PNG data URI，返回 (宽, 高, RGBA 点阵)
pub fn decode_png_data_uri(value: &str) -> AppResult<(u32, u32, Vec<u8>)> {
    let payload = value
        .strip_prefix(PNG_DATA_URI_PREFIX)
        .ok_or_else(|| AppError::image_encoding_error("不是 PNG data URI"))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| AppError::image_encoding_error(format!("Base64 解码失败: {}", e)))?;
    let decoder = png::Decoder::new(bytes.as_slice());
    let mut reader = decoder
        .read_info()
        .map_err(|e| AppError::image_encoding_error(format!("PNG 解码失败: {}", e)))?;
    let mut out = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut out)
        .map_err(|e| AppError::image_encoding_error(format!("PNG 解码失败: {}", e)))?;
    out.truncate(info.buffer_size());
    Ok((info.width, info.height, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(x: f64, y: f64) -> PointerPosition {
        PointerPosition::Mouse { offset_x: x, offset_y: y }
    }

    #[test]
    fn new_pad_is_blank_and_scaled() {
        let pad = SignaturePad::new(300, 100, 2.0);
        assert_eq!((pad.width(), pad.height()), (600, 200));
        assert!(pad.is_blank());

        let low = SignaturePad::new(300, 100, 0.5);
        assert_eq!(low.ratio(), 1.0);
        assert_eq!((low.width(), low.height()), (300, 100));

        let tiny = SignaturePad::new(0, 0, 1.0);
        assert_eq!((tiny.width(), tiny.height()), (1, 1));
    }

    #[test]
    fn start_alone_draws_nothing() {
        let mut pad = SignaturePad::new(100, 50, 1.0);
        pad.start_stroke(mouse(10.0, 10.0));
        pad.end_stroke();
        assert!(pad.is_blank());
    }

    #[test]
    fn extend_without_start_is_ignored() {
        let mut pad = SignaturePad::new(100, 50, 1.0);
        pad.extend_stroke(mouse(10.0, 10.0));
        assert!(pad.is_blank());
        assert!(!pad.is_drawing());
    }

    #[test]
    fn stroke_marks_pad_and_clear_resets() {
        let mut pad = SignaturePad::new(100, 50, 1.0);
        pad.start_stroke(mouse(10.0, 10.0));
        pad.extend_stroke(mouse(40.0, 25.0));
        pad.end_stroke();
        assert!(!pad.is_blank());
        assert_ne!(pad.export_image().unwrap(), pad.blank_reference_image().unwrap());

        pad.clear();
        assert!(pad.is_blank());
        assert_eq!(pad.export_image().unwrap(), pad.blank_reference_image().unwrap());
    }

    #[test]
    fn touch_coordinates_are_relative_to_rect() {
        let mut pad = SignaturePad::new(100, 50, 2.0);
        let touch = |x, y| PointerPosition::Touch { client_x: x, client_y: y, rect_left: 20.0, rect_top: 30.0 };
        pad.start_stroke(touch(30.0, 40.0));
        pad.extend_stroke(touch(31.0, 40.0));
        let (w, _, rgba) = decode_png_data_uri(&pad.export_image().unwrap()).unwrap();
        // CSS (10,10) → 点阵 (20,20)
        let idx = ((20 * w + 20) * 4) as usize;
        assert_eq!(&rgba[idx..idx + 4], &[0, 0, 0, 255]);
    }

    #[test]
    fn resize_discards_drawing() {
        let mut pad = SignaturePad::new(100, 50, 1.0);
        pad.start_stroke(mouse(10.0, 10.0));
        pad.extend_stroke(mouse(20.0, 20.0));
        pad.resize(200, 80);
        assert!(pad.is_blank());
        assert!(!pad.is_drawing());
        assert_eq!((pad.width(), pad.height()), (200, 80));
    }

    #[test]
    fn export_is_valid_png_data_uri() {
        let mut pad = SignaturePad::new(40, 20, 1.0);
        pad.start_stroke(mouse(5.0, 5.0));
        pad.extend_stroke(mouse(30.0, 15.0));
        let uri = pad.export_image().unwrap();
        assert!(uri.starts_with(PNG_DATA_URI_PREFIX));
        assert!(is_png_data_uri(&uri));
        let (w, h, rgba) = decode_png_data_uri(&uri).unwrap();
        assert_eq!((w, h), (40, 20));
        assert!(rgba.iter().any(|b| *b != 0));

        assert!(!is_png_data_uri("data:image/png;base64,!!!"));
        assert!(!is_png_data_uri("javascript:alert(1)"));
    }
}
