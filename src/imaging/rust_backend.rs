//! Pure Rust software backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory` |
//! | Crop | `DynamicImage::crop_imm`, clipped to the image |
//! | Pre-shrink | `resize_exact` with `FilterType::Nearest` |
//! | Resize | `resize_exact` with the configured [`Scaler`] |
//! | Encode → JPEG / PNG / GIF | `image::codecs::{jpeg, png, gif}` |
//!
//! Blur and WebP output are not available here and report
//! [`BackendError::Unsupported`].

use super::backend::{BackendError, Dimensions, ImageBackend, SourceFormat};
use super::calculations::plan_fit;
use super::params::{CropRect, Quality, Scaler};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame, GenericImageView};

/// Software backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    scaler: Scaler,
}

impl RustBackend {
    pub fn new(scaler: Scaler) -> Self {
        Self { scaler }
    }

    pub fn scaler(&self) -> Scaler {
        self.scaler
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new(Scaler::default())
    }
}

impl ImageBackend for RustBackend {
    type Image = DynamicImage;

    fn name(&self) -> &'static str {
        "software"
    }

    fn decode(&self, bytes: &[u8]) -> Result<(DynamicImage, SourceFormat), BackendError> {
        let format = SourceFormat::sniff(bytes)
            .ok_or_else(|| BackendError::ProcessingFailed("Unhandled image format".to_string()))?;
        let image = image::load_from_memory(bytes).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {e}", format.name()))
        })?;
        Ok((image, format))
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        let (width, height) = image.dimensions();
        Dimensions { width, height }
    }

    fn crop(&self, image: &DynamicImage, rect: CropRect) -> Result<DynamicImage, BackendError> {
        let (width, height) = image.dimensions();
        let right = rect.x.saturating_add(rect.width).min(width);
        let bottom = rect.y.saturating_add(rect.height).min(height);
        if rect.x >= right || rect.y >= bottom {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop {rect:?} does not intersect the {width}x{height} image"
            )));
        }
        Ok(image.crop_imm(rect.x, rect.y, right - rect.x, bottom - rect.y))
    }

    fn resize(
        &self,
        image: &DynamicImage,
        target: (u32, u32),
        fast: bool,
    ) -> Result<Option<DynamicImage>, BackendError> {
        let Some(plan) = plan_fit(self.dimensions(image), target, fast)? else {
            return Ok(None);
        };
        let pre_shrunk = if plan.pre_shrink > 1 && self.scaler != Scaler::NearestNeighbor {
            let factor = plan.pre_shrink as f64;
            let (width, height) = image.dimensions();
            let width = ((width as f64 / factor).round() as u32).max(1);
            let height = ((height as f64 / factor).round() as u32).max(1);
            tracing::debug!(factor = plan.pre_shrink, width, height, "nearest-neighbor pre-shrink");
            Some(image.resize_exact(width, height, FilterType::Nearest))
        } else {
            None
        };
        let current = pre_shrunk.as_ref().unwrap_or(image);
        Ok(Some(current.resize_exact(
            plan.output.width,
            plan.output.height,
            self.scaler.filter(),
        )))
    }

    fn blur(&self, _image: &DynamicImage, _radius: u32) -> Result<DynamicImage, BackendError> {
        Err(BackendError::Unsupported {
            backend: self.name(),
            operation: "blur",
        })
    }

    fn output_format(&self, source: SourceFormat) -> Result<SourceFormat, BackendError> {
        match source {
            SourceFormat::Webp => Err(BackendError::Unsupported {
                backend: self.name(),
                operation: "webp encoding",
            }),
            other => Ok(other),
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: SourceFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        let result = match format {
            SourceFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut out, quality.value() as u8);
                DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
            }
            SourceFormat::Png => image.write_with_encoder(PngEncoder::new(&mut out)),
            SourceFormat::Gif => {
                let mut encoder = GifEncoder::new(&mut out);
                encoder.encode_frame(Frame::new(image.to_rgba8()))
            }
            SourceFormat::Webp => {
                return Err(BackendError::Unsupported {
                    backend: self.name(),
                    operation: "webp encoding",
                });
            }
        };
        result.map_err(|e| {
            BackendError::ProcessingFailed(format!("{} encode failed: {e}", format.name()))
        })?;
        Ok(out)
    }
}
