//! Accelerated backend: every stage runs on the in-process engine.
//!
//! | Stage | Engine path |
//! |---|---|
//! | Decode | `jpegload` / `pngload` / `gifload` / `webpload` on the source bytes |
//! | Crop | `extract_area` |
//! | Resize | optional integer `shrink`, then `reduce` with Lanczos3 |
//! | Blur | `gaussblur`, sigma = radius |
//! | Encode | JPEG (optimized, stripped, no subsampling), PNG (compression 6), WebP |

use super::backend::{BackendError, Dimensions, ImageBackend, SourceFormat};
use super::calculations::{fit_scale, plan_fit};
use super::handle::Image;
use super::ops;
use super::options::{JpegEncodeOptions, PngEncodeOptions, Setting, WebpEncodeOptions};
use super::params::{CropRect, Quality};
use crate::engine::{self, EngineConfig, Kernel};

pub struct EngineBackend;

impl EngineBackend {
    /// Start the engine with its default settings.
    pub fn new() -> Result<Self, BackendError> {
        engine::initialize()?;
        Ok(Self)
    }

    /// Start the engine and apply `config`.
    pub fn with_config(config: EngineConfig) -> Result<Self, BackendError> {
        engine::initialize_with(config)?;
        Ok(Self)
    }
}

fn to_i32(value: u32) -> Result<i32, BackendError> {
    i32::try_from(value)
        .map_err(|_| BackendError::ProcessingFailed(format!("{value} is out of range")))
}

impl ImageBackend for EngineBackend {
    type Image = Image;

    fn name(&self) -> &'static str {
        "engine"
    }

    fn decode(&self, bytes: &[u8]) -> Result<(Image, SourceFormat), BackendError> {
        let format = SourceFormat::sniff(bytes)
            .ok_or_else(|| BackendError::ProcessingFailed("Unhandled image format".to_string()))?;
        let image = match format {
            SourceFormat::Jpeg => ops::decode_jpeg_bytes(bytes, None),
            SourceFormat::Png => ops::decode_png_bytes(bytes, None),
            SourceFormat::Gif => ops::decode_gif_bytes(bytes, None),
            SourceFormat::Webp => ops::decode_webp_bytes(bytes, None),
        }?;
        Ok((image, format))
    }

    fn dimensions(&self, image: &Image) -> Dimensions {
        image.dimensions()
    }

    fn crop(&self, image: &Image, rect: CropRect) -> Result<Image, BackendError> {
        Ok(ops::crop(
            image,
            to_i32(rect.x)?,
            to_i32(rect.y)?,
            to_i32(rect.width)?,
            to_i32(rect.height)?,
        )?)
    }

    fn resize(
        &self,
        image: &Image,
        target: (u32, u32),
        fast: bool,
    ) -> Result<Option<Image>, BackendError> {
        let Some(plan) = plan_fit(image.dimensions(), target, fast)? else {
            return Ok(None);
        };
        let shrunk = if plan.pre_shrink > 1 {
            let factor = plan.pre_shrink as f64;
            Some(ops::shrink(image, factor, factor)?)
        } else {
            None
        };
        let current = shrunk.as_ref().unwrap_or(image);
        let Dimensions { width, height } = current.dimensions();
        tracing::debug!(
            pre_shrink = plan.pre_shrink,
            intermediate = ?(width, height),
            output = ?plan.output,
            "engine resize"
        );
        if fit_scale((width, height), target) >= 1.0 {
            return Ok(shrunk);
        }
        let reduced = ops::reduce(
            current,
            width as f64 / plan.output.width as f64,
            height as f64 / plan.output.height as f64,
            Kernel::Lanczos3,
        )?;
        Ok(Some(reduced))
    }

    fn blur(&self, image: &Image, radius: u32) -> Result<Image, BackendError> {
        Ok(ops::blur(image, radius as f64, None)?)
    }

    fn output_format(&self, source: SourceFormat) -> Result<SourceFormat, BackendError> {
        Ok(match source {
            SourceFormat::Jpeg => SourceFormat::Jpeg,
            SourceFormat::Png | SourceFormat::Gif => SourceFormat::Png,
            SourceFormat::Webp => SourceFormat::Webp,
        })
    }

    fn encode(
        &self,
        image: &Image,
        format: SourceFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let quality = Setting::Value(quality.value() as i32);
        let bytes = match format {
            SourceFormat::Jpeg => {
                let options = JpegEncodeOptions {
                    quality,
                    optimize_coding: true,
                    strip: true,
                    no_subsample: true,
                    ..Default::default()
                };
                ops::encode_jpeg_bytes(image, Some(&options))?
            }
            SourceFormat::Png => {
                let options = PngEncodeOptions {
                    compression: Setting::Value(6),
                    ..Default::default()
                };
                ops::encode_png_bytes(image, Some(&options))?
            }
            SourceFormat::Webp => {
                let options = WebpEncodeOptions {
                    quality,
                    ..Default::default()
                };
                ops::encode_webp_bytes(image, Some(&options))?
            }
            SourceFormat::Gif => {
                return Err(BackendError::Unsupported {
                    backend: self.name(),
                    operation: "gif encoding",
                });
            }
        };
        Ok(bytes)
    }
}
