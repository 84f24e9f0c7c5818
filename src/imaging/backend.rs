//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the stages every backend runs for the
//! pipeline: decode, crop, resize, blur and encode. Two implementations exist:
//!
//! | Backend | Image type | Blur | WebP out |
//! |---|---|---|---|
//! | [`EngineBackend`](super::engine_backend::EngineBackend) | [`Image`](super::handle::Image) handle | yes | yes |
//! | [`RustBackend`](super::rust_backend::RustBackend) | `image::DynamicImage` | unsupported | unsupported |
//!
//! Transforms borrow their input and return a new image; releasing the input
//! is the caller's business.

use super::calculations::FitError;
use super::params::{CropRect, Quality};
use crate::engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Container formats the pipeline reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl SourceFormat {
    /// Identify `bytes` by magic number.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            image::ImageFormat::Png => Some(SourceFormat::Png),
            image::ImageFormat::Gif => Some(SourceFormat::Gif),
            image::ImageFormat::WebP => Some(SourceFormat::Webp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::Gif => "gif",
            SourceFormat::Webp => "webp",
        }
    }
}

/// One backend's implementation of the pipeline stages.
///
/// A backend is chosen once per run and every stage goes through it.
pub trait ImageBackend {
    type Image;

    /// Short name for messages.
    fn name(&self) -> &'static str;

    /// Decode any supported container, reporting what it was.
    fn decode(&self, bytes: &[u8]) -> Result<(Self::Image, SourceFormat), BackendError>;

    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    fn crop(&self, image: &Self::Image, rect: CropRect) -> Result<Self::Image, BackendError>;

    /// Fit within `target`. `None` means the image already fits and is
    /// left as it is.
    fn resize(
        &self,
        image: &Self::Image,
        target: (u32, u32),
        fast: bool,
    ) -> Result<Option<Self::Image>, BackendError>;

    /// Gaussian blur with the given radius in pixels.
    fn blur(&self, image: &Self::Image, radius: u32) -> Result<Self::Image, BackendError>;

    /// Container written for a source of format `source`.
    fn output_format(&self, source: SourceFormat) -> Result<SourceFormat, BackendError>;

    fn encode(
        &self,
        image: &Self::Image,
        format: SourceFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::plan_fit;
    use std::sync::Mutex;

    /// Mock backend that records operations without touching pixels.
    /// Its "image" is just a size.
    #[derive(Default)]
    pub struct MockBackend {
        pub source: Option<(Dimensions, SourceFormat)>,
        pub blur_supported: bool,
        /// Stage name that should fail.
        pub fail_on: Option<&'static str>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode,
        Crop(CropRect),
        Resize { target: (u32, u32), fast: bool },
        Blur(u32),
        Encode { format: SourceFormat, quality: u32 },
    }

    impl MockBackend {
        pub fn new(width: u32, height: u32, format: SourceFormat) -> Self {
            Self {
                source: Some((Dimensions { width, height }, format)),
                blur_supported: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, stage: &'static str, op: RecordedOp) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(op);
            if self.fail_on == Some(stage) {
                return Err(BackendError::ProcessingFailed(format!("mock {stage} failure")));
            }
            Ok(())
        }
    }

    impl ImageBackend for MockBackend {
        type Image = Dimensions;

        fn name(&self) -> &'static str {
            "mock"
        }

        fn decode(&self, _bytes: &[u8]) -> Result<(Dimensions, SourceFormat), BackendError> {
            self.record("decode", RecordedOp::Decode)?;
            self.source
                .ok_or_else(|| BackendError::ProcessingFailed("No mock source".to_string()))
        }

        fn dimensions(&self, image: &Dimensions) -> Dimensions {
            *image
        }

        fn crop(&self, _image: &Dimensions, rect: CropRect) -> Result<Dimensions, BackendError> {
            self.record("crop", RecordedOp::Crop(rect))?;
            Ok(Dimensions {
                width: rect.width,
                height: rect.height,
            })
        }

        fn resize(
            &self,
            image: &Dimensions,
            target: (u32, u32),
            fast: bool,
        ) -> Result<Option<Dimensions>, BackendError> {
            self.record("resize", RecordedOp::Resize { target, fast })?;
            Ok(plan_fit(*image, target, fast)?.map(|plan| plan.output))
        }

        fn blur(&self, image: &Dimensions, radius: u32) -> Result<Dimensions, BackendError> {
            self.record("blur", RecordedOp::Blur(radius))?;
            if !self.blur_supported {
                return Err(BackendError::Unsupported {
                    backend: "mock",
                    operation: "blur",
                });
            }
            Ok(*image)
        }

        fn output_format(&self, source: SourceFormat) -> Result<SourceFormat, BackendError> {
            Ok(source)
        }

        fn encode(
            &self,
            _image: &Dimensions,
            format: SourceFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.record(
                "encode",
                RecordedOp::Encode {
                    format,
                    quality: quality.value(),
                },
            )?;
            Ok(b"mock".to_vec())
        }
    }

    #[test]
    fn mock_records_stages_in_order() {
        let backend = MockBackend::new(800, 600, SourceFormat::Jpeg);
        let (image, format) = backend.decode(b"").unwrap();
        let resized = backend.resize(&image, (400, 400), true).unwrap().unwrap();
        backend.encode(&resized, format, Quality::new(90)).unwrap();

        assert_eq!(resized, Dimensions { width: 400, height: 300 });
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Decode,
                RecordedOp::Resize {
                    target: (400, 400),
                    fast: true
                },
                RecordedOp::Encode {
                    format: SourceFormat::Jpeg,
                    quality: 90
                },
            ]
        );
    }

    #[test]
    fn mock_failure_injection() {
        let backend = MockBackend {
            fail_on: Some("crop"),
            ..MockBackend::new(10, 10, SourceFormat::Png)
        };
        let (image, _) = backend.decode(b"").unwrap();
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 5,
            height: 5,
        };
        assert!(backend.crop(&image, rect).is_err());
    }

    #[test]
    fn sniff_recognizes_pipeline_formats() {
        assert_eq!(SourceFormat::sniff(b"\xFF\xD8\xFF\xE0"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::sniff(b"GIF89a"), Some(SourceFormat::Gif));
        assert_eq!(SourceFormat::sniff(b"\x89PNG\r\n\x1a\n"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::sniff(b"nothing"), None);
    }
}
