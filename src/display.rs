//! Tone mapping and saving of accumulated framebuffers

use crate::config::RenderSettings;
use crate::error::{ViewerError, ViewerResult};
use crate::framebuffer::{Color, FrameBuffer};
use image::{Rgba, RgbaImage};
use std::path::Path;

fn encode_channel(value: f32, exposure: f32, inverse_gamma: f32) -> u8 {
    let linear = (value * exposure).clamp(0.0, 1.0);
    (linear.powf(inverse_gamma) * 255.0).round() as u8
}

/// Convert a framebuffer to 8-bit RGBA.
///
/// Sampled pixels show `mean * exposure`, gamma-encoded; unsampled pixels
/// show `background` as is.
pub fn tonemap(framebuffer: &FrameBuffer, exposure: f32, gamma: f32, background: Color) -> RgbaImage {
    let inverse_gamma = if gamma > 0.0 { 1.0 / gamma } else { 1.0 };
    let background = Rgba([
        encode_channel(background.x, 1.0, 1.0),
        encode_channel(background.y, 1.0, 1.0),
        encode_channel(background.z, 1.0, 1.0),
        255,
    ]);

    RgbaImage::from_fn(framebuffer.width(), framebuffer.height(), |x, y| {
        match framebuffer.read(x, y) {
            Some(pixel) if pixel.is_sampled() => Rgba([
                encode_channel(pixel.color.x, exposure, inverse_gamma),
                encode_channel(pixel.color.y, exposure, inverse_gamma),
                encode_channel(pixel.color.z, exposure, inverse_gamma),
                255,
            ]),
            _ => background,
        }
    })
}

/// Tone-map with the display settings and write the image; the format
/// follows the file extension.
pub fn save_framebuffer(framebuffer: &FrameBuffer, path: &Path, settings: &RenderSettings) -> ViewerResult<()> {
    let image = tonemap(
        framebuffer,
        settings.exposure,
        settings.gamma,
        settings.background.into(),
    );

    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    let result = if is_jpeg {
        image::DynamicImage::ImageRgba8(image).to_rgb8().save(path)
    } else {
        image.save(path)
    };
    result.map_err(|e| ViewerError::ImageSave {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    log::info!(
        "[Display::save_framebuffer] Saved {}x{} render to {}",
        framebuffer.width(),
        framebuffer.height(),
        path.display()
    );
    Ok(())
}
