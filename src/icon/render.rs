//! 图标栅格化
//!
//! 缩放到最长边不超过 120px，按最短边百分比裁圆角，输出 PNG（无损，
//! 反复生成不会叠加压缩损失），再做 Base64。校验值是 Base64 文本的 MD5。

use std::io::Cursor;

use anyhow::{Context, Result};
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use md5::{Digest, Md5};

/// 图标最长边
pub const MAX_ICON_SIZE: u32 = 120;

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedIcon {
    /// Base64 文本的 MD5（小写十六进制）
    pub checksum: String,
    /// Base64 编码的 PNG
    pub payload: String,
}

/// 渲染应用图标：校验值基于裁圆角后的结果
pub fn render_icon(bytes: &[u8], corner_radius_percent: u8) -> Result<RenderedIcon> {
    let img = decode_and_fit(bytes)?;
    let payload = encode_png_base64(&round_corners(img, corner_radius_percent))?;
    Ok(RenderedIcon {
        checksum: md5_hex(&payload),
        payload,
    })
}

/// 渲染通知自带的大图标
///
/// 校验值基于未裁圆角的图，这样同一张图标在不同圆角设置下对服务端是同一个。
pub fn render_notification_icon(bytes: &[u8], corner_radius_percent: u8) -> Result<RenderedIcon> {
    let img = decode_and_fit(bytes)?;
    let checksum = md5_hex(&encode_png_base64(&img)?);
    let payload = encode_png_base64(&round_corners(img, corner_radius_percent))?;
    Ok(RenderedIcon { checksum, payload })
}

/// MD5 十六进制
pub fn md5_hex(text: &str) -> String {
    hex::encode(Md5::digest(text.as_bytes()))
}

fn decode_and_fit(bytes: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(bytes).context("Failed to decode icon")?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        anyhow::bail!("icon has zero size");
    }
    if w.max(h) <= MAX_ICON_SIZE {
        return Ok(img);
    }
    // resize 保持宽高比，结果落在 120x120 之内
    Ok(img.resize(MAX_ICON_SIZE, MAX_ICON_SIZE, FilterType::Lanczos3))
}

fn encode_png_base64(img: &DynamicImage) -> Result<String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("Failed to encode icon as PNG")?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&buf))
}

/// 圆角遮罩，百分比为 0 时原样返回
fn round_corners(img: DynamicImage, percent: u8) -> DynamicImage {
    if percent == 0 {
        return img;
    }

    let mut rgba: RgbaImage = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let radius = w.min(h) as f32 * f32::from(percent.min(50)) / 100.0;
    if radius < 1.0 {
        return DynamicImage::ImageRgba8(rgba);
    }

    for (x, y, pixel) in rgba.enumerate_pixels_mut() {
        let coverage = corner_coverage(x, y, w, h, radius);
        if coverage < 1.0 {
            pixel[3] = (f32::from(pixel[3]) * coverage).round() as u8;
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

/// 像素落在圆角内的比例（边缘 1px 做线性过渡）
fn corner_coverage(x: u32, y: u32, w: u32, h: u32, radius: f32) -> f32 {
    let px = x as f32 + 0.5;
    let py = y as f32 + 0.5;
    let (w, h) = (w as f32, h as f32);

    let cx = if px < radius {
        radius
    } else if px > w - radius {
        w - radius
    } else {
        return 1.0;
    };
    let cy = if py < radius {
        radius
    } else if py > h - radius {
        h - radius
    } else {
        return 1.0;
    };

    let distance = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
    (radius - distance + 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 40, 40, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn decode(payload: &str) -> DynamicImage {
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_large_icon_is_scaled_keeping_aspect() {
        let icon = render_icon(&png(480, 240), 0).unwrap();
        assert_eq!(decode(&icon.payload).dimensions(), (120, 60));
    }

    #[test]
    fn test_small_icon_is_not_upscaled() {
        let icon = render_icon(&png(48, 48), 0).unwrap();
        assert_eq!(decode(&icon.payload).dimensions(), (48, 48));
    }

    #[test]
    fn test_checksum_is_md5_of_base64_text() {
        let icon = render_icon(&png(32, 32), 20).unwrap();
        assert_eq!(icon.checksum, md5_hex(&icon.payload));
        assert_eq!(icon.checksum.len(), 32);
    }

    #[test]
    fn test_md5_hex_known_value() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_corners_become_transparent() {
        let icon = render_icon(&png(100, 100), 50).unwrap();
        let img = decode(&icon.payload).to_rgba8();
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(99, 99)[3], 0);
        assert_eq!(img.get_pixel(50, 50)[3], 255);

        // 边的中点不受影响
        let icon = render_icon(&png(100, 100), 20).unwrap();
        let img = decode(&icon.payload).to_rgba8();
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(50, 0)[3], 255);
    }

    #[test]
    fn test_zero_radius_keeps_square() {
        let icon = render_icon(&png(100, 100), 0).unwrap();
        let img = decode(&icon.payload).to_rgba8();
        assert_eq!(img.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_notification_icon_checksum_ignores_rounding() {
        let bytes = png(64, 64);
        let a = render_notification_icon(&bytes, 0).unwrap();
        let b = render_notification_icon(&bytes, 40).unwrap();
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.payload, b.payload);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(render_icon(b"not an image", 20).is_err());
    }
}
