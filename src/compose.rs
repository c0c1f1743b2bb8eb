//! Photo composition
//!
//! Turns a raw camera frame into the kiosk photo (mirror, crop, contain-fit,
//! overlay), lays photos out on paper for printing and renders the live
//! preview as it appears on stage.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use thiserror::Error;

use crate::config::CropRect;
use crate::flow::CaptureRequest;
use crate::quad::Quad;
use crate::transform::compute_transform;

/// Print resolution: 300 dpi
pub const PRINT_PX_PER_MM: f64 = 11.811;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("failed to load overlay {path}: {source}")]
    OverlayLoad {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Mirror, then crop in the mirrored (displayed) coordinates
pub fn prepare_frame(frame: &RgbImage, mirror: bool, crop: &CropRect) -> RgbImage {
    let mirrored;
    let source = if mirror {
        mirrored = imageops::flip_horizontal(frame);
        &mirrored
    } else {
        frame
    };

    if crop.is_full_frame() {
        return source.clone();
    }

    let (w, h) = (source.width() as f64, source.height() as f64);
    let x = ((crop.x * w).round() as u32).min(source.width().saturating_sub(1));
    let y = ((crop.y * h).round() as u32).min(source.height().saturating_sub(1));
    let cw = ((crop.width * w).round() as u32).clamp(1, source.width() - x);
    let ch = ((crop.height * h).round() as u32).clamp(1, source.height() - y);
    imageops::crop_imm(source, x, y, cw, ch).to_image()
}

fn resize_rgb(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        img.clone()
    } else {
        imageops::resize(img, width.max(1), height.max(1), FilterType::Triangle)
    }
}

/// Scale to fit inside `width`x`height`, centered on `background`
fn contain_fit(img: &RgbImage, width: u32, height: u32, background: Rgb<u8>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, background);
    let scale = (width as f64 / img.width() as f64).min(height as f64 / img.height() as f64);
    let fw = ((img.width() as f64 * scale).round() as u32).clamp(1, width);
    let fh = ((img.height() as f64 * scale).round() as u32).clamp(1, height);
    let fitted = resize_rgb(img, fw, fh);
    imageops::overlay(
        &mut canvas,
        &fitted,
        ((width - fw) / 2) as i64,
        ((height - fh) / 2) as i64,
    );
    canvas
}

/// Scale to cover `width`x`height`, cropping the overflow around the center
fn cover_fit(img: &RgbImage, width: u32, height: u32, background: Rgb<u8>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, background);
    let scale = (width as f64 / img.width() as f64).max(height as f64 / img.height() as f64);
    let fw = ((img.width() as f64 * scale).round() as u32).max(width);
    let fh = ((img.height() as f64 * scale).round() as u32).max(height);
    let scaled = resize_rgb(img, fw, fh);
    let cropped = imageops::crop_imm(&scaled, (fw - width) / 2, (fh - height) / 2, width, height).to_image();
    imageops::overlay(&mut canvas, &cropped, 0, 0);
    canvas
}

/// Alpha-blend `overlay`, stretched over the whole canvas
fn apply_overlay(canvas: RgbImage, overlay: &RgbaImage) -> RgbImage {
    let (width, height) = canvas.dimensions();
    let stretched;
    let overlay = if overlay.dimensions() == (width, height) {
        overlay
    } else {
        stretched = imageops::resize(overlay, width, height, FilterType::Triangle);
        &stretched
    };
    let mut rgba = DynamicImage::ImageRgb8(canvas).to_rgba8();
    imageops::overlay(&mut rgba, overlay, 0, 0);
    DynamicImage::ImageRgba8(rgba).to_rgb8()
}

/// Build the photo for a capture request
pub fn compose_photo(frame: &RgbImage, request: &CaptureRequest, overlay: Option<&RgbaImage>) -> RgbImage {
    let prepared = prepare_frame(frame, request.mirror, &request.crop);
    let canvas = contain_fit(&prepared, request.width, request.height, Rgb([0, 0, 0]));
    match overlay {
        Some(overlay) => apply_overlay(canvas, overlay),
        None => canvas,
    }
}

pub fn load_overlay(path: &str) -> Result<RgbaImage, ComposeError> {
    image::open(Path::new(path))
        .map(|img| img.to_rgba8())
        .map_err(|source| ComposeError::OverlayLoad {
            path: path.to_string(),
            source,
        })
}

pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, ComposeError> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)?;
    Ok(out)
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, ComposeError> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Jpeg(quality))?;
    Ok(out)
}

/// Paper size in print pixels
pub fn paper_pixels(width_mm: f64, height_mm: f64) -> (u32, u32) {
    (
        (width_mm * PRINT_PX_PER_MM).round().max(1.0) as u32,
        (height_mm * PRINT_PX_PER_MM).round().max(1.0) as u32,
    )
}

/// Cover-fit a photo (PNG/JPEG bytes) onto a white page of the given paper size
pub fn print_layout(photo: &[u8], width_mm: f64, height_mm: f64) -> Result<Vec<u8>, ComposeError> {
    let img = image::load_from_memory(photo)?.to_rgb8();
    let (width, height) = paper_pixels(width_mm, height_mm);
    let page = cover_fit(&img, width, height, Rgb([255, 255, 255]));
    encode_png(&page)
}

/// Preview placement on a scaled-down stage
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewLayout {
    pub quad: Quad,
    pub rectangle: bool,
    pub mirror: bool,
    pub crop: CropRect,
}

/// Render the camera frame warped into the preview quad on a black stage
pub fn render_preview(frame: &RgbImage, layout: &PreviewLayout, width: u32, height: u32) -> RgbImage {
    let prepared = prepare_frame(frame, layout.mirror, &layout.crop);
    let quad = if layout.rectangle {
        Quad::from_rect(layout.quad.bounding_rect())
    } else {
        layout.quad
    };

    let projection = compute_transform(
        quad.to_pixels(width as f64, height as f64),
        prepared.width() as f64,
        prepared.height() as f64,
    )
    .and_then(|h| Projection::from_matrix(h.matrix3().map(|v| v as f32)));

    match projection {
        Some(projection) => {
            let mut canvas = RgbImage::new(width, height);
            warp_into(
                &prepared,
                &projection,
                Interpolation::Bilinear,
                Rgb([0, 0, 0]),
                &mut canvas,
            );
            canvas
        }
        None => {
            tracing::debug!("Preview quad is degenerate, showing the full frame");
            contain_fit(&prepared, width, height, Rgb([0, 0, 0]))
        }
    }
}
