//! Shared test utilities for the dualscale test suite.
//!
//! Synthesizes small encoded images in memory so unit tests never depend on
//! fixture files, plus a couple of file helpers for the file-path operations.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! init_engine();
//! let bytes = jpeg_bytes(64, 48);
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_fixture(&tmp, "photo.jpg", &bytes);
//! ```

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, Frame, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::PathBuf;
use tempfile::TempDir;

// =========================================================================
// Engine
// =========================================================================

/// Start the engine. Every test that touches it calls this; it is idempotent.
pub fn init_engine() {
    crate::engine::initialize().unwrap();
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// A gradient so resamplers have something to chew on.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Baseline JPEG of a gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// RGBA PNG filled with one colour.
pub fn png_rgba_bytes(width: u32, height: u32, fill: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(fill));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// Single-frame GIF.
pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.encode_frame(Frame::new(img)).unwrap();
    }
    out
}

/// Lossless WebP of a gradient.
pub fn webp_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    WebPEncoder::new_lossless(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

// =========================================================================
// Files
// =========================================================================

/// Write `bytes` under `dir` and return the full path.
pub fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
