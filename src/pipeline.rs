//! Single-image pipeline: decode, optional crop, resize and blur, encode.
//!
//! ```text
//! Decode → [Crop] → [Resize] → [Blur] → Encode
//! ```
//!
//! The order is fixed: crop always runs before resize. One backend is chosen
//! for the whole run. Every stage is timed; skipped stages keep a zero
//! duration. The first failure ends the run and nothing is written.
//!
//! The software backend cannot blur. That is not a failure: the stage is
//! skipped, a warning is logged and a notice is returned with the output.
//!
//! Remote sources (`http://`, `https://`) are downloaded next to the
//! destination first, see [`resolve_source`].

use crate::imaging::{BackendError, CropRect, Dimensions, FitBox, ImageBackend, Quality, SourceFormat};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BackendError,
    },
    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("{0} not found")]
    NotFound(String),
}

/// What to do to one image.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    /// Applied first, in source pixel coordinates.
    pub crop: Option<CropRect>,
    /// Fit within this box, never upscaling.
    pub resize: Option<FitBox>,
    pub fast_resize: bool,
    /// Gaussian blur radius in pixels; 0 disables the stage.
    pub blur: u32,
    pub quality: Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Crop,
    Resize,
    Blur,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Decode => "Decode",
            Stage::Crop => "Crop",
            Stage::Resize => "Resize",
            Stage::Blur => "Blur",
            Stage::Encode => "Encode",
        })
    }
}

/// Wall-clock time per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub decode: Duration,
    pub crop: Duration,
    pub resize: Duration,
    pub blur: Duration,
    pub encode: Duration,
    pub total: Duration,
}

impl StageTimings {
    fn slot(&mut self, stage: Stage) -> &mut Duration {
        match stage {
            Stage::Decode => &mut self.decode,
            Stage::Crop => &mut self.crop,
            Stage::Resize => &mut self.resize,
            Stage::Blur => &mut self.blur,
            Stage::Encode => &mut self.encode,
        }
    }

    pub fn get(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Decode => self.decode,
            Stage::Crop => self.crop,
            Stage::Resize => self.resize,
            Stage::Blur => self.blur,
            Stage::Encode => self.encode,
        }
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub bytes: Vec<u8>,
    pub format: SourceFormat,
    pub dimensions: Dimensions,
    pub timings: StageTimings,
    /// Stages that were skipped rather than failed, in human form.
    pub notices: Vec<String>,
}

/// Run `stage`, store its elapsed time and tag any error with the stage.
fn timed<T>(
    timings: &mut StageTimings,
    stage: Stage,
    work: impl FnOnce() -> Result<T, BackendError>,
) -> Result<T, PipelineError> {
    let started = Instant::now();
    let result = work();
    *timings.slot(stage) = started.elapsed();
    tracing::debug!(%stage, elapsed = ?timings.get(stage), ok = result.is_ok(), "stage finished");
    result.map_err(|source| PipelineError::Stage { stage, source })
}

/// Run the pipeline over encoded `bytes` with one backend.
pub fn run_pipeline<B: ImageBackend>(
    backend: &B,
    bytes: &[u8],
    request: &PipelineRequest,
) -> Result<PipelineOutput, PipelineError> {
    let started = Instant::now();
    let mut timings = StageTimings::default();
    let mut notices = Vec::new();

    let (mut image, source) = timed(&mut timings, Stage::Decode, || backend.decode(bytes))?;

    if let Some(rect) = request.crop {
        image = timed(&mut timings, Stage::Crop, || backend.crop(&image, rect))?;
    }

    if let Some(fit) = request.resize {
        let resized = timed(&mut timings, Stage::Resize, || {
            backend.resize(&image, (fit.width, fit.height), request.fast_resize)
        })?;
        if let Some(resized) = resized {
            image = resized;
        }
    }

    if request.blur > 0 {
        let blurred = Instant::now();
        match backend.blur(&image, request.blur) {
            Ok(out) => {
                image = out;
                timings.blur = blurred.elapsed();
            }
            Err(BackendError::Unsupported { backend, operation }) => {
                tracing::warn!(backend, operation, "skipping unsupported stage");
                notices.push(format!(
                    "Blur not supported by the {backend} backend, output is not blurred"
                ));
            }
            Err(source) => {
                return Err(PipelineError::Stage {
                    stage: Stage::Blur,
                    source,
                });
            }
        }
    }

    let (bytes, format) = timed(&mut timings, Stage::Encode, || {
        let format = backend.output_format(source)?;
        Ok((backend.encode(&image, format, request.quality)?, format))
    })?;

    timings.total = started.elapsed();
    Ok(PipelineOutput {
        bytes,
        format,
        dimensions: backend.dimensions(&image),
        timings,
        notices,
    })
}

/// Read `source`, run the pipeline and write `destination`.
///
/// The destination is only touched when every stage succeeded.
pub fn process_file<B: ImageBackend>(
    backend: &B,
    source: &Path,
    destination: &Path,
    request: &PipelineRequest,
) -> Result<PipelineOutput, PipelineError> {
    let bytes = std::fs::read(source)?;
    let output = run_pipeline(backend, &bytes, request)?;
    std::fs::write(destination, &output.bytes)?;
    tracing::debug!(
        destination = %destination.display(),
        size = output.bytes.len(),
        format = output.format.name(),
        "output written"
    );
    Ok(output)
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Where a remote source for `destination` is saved:
/// `out/photo.jpg` → `out/photo_original.jpg`.
pub fn original_download_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match destination.extension() {
        Some(ext) => format!("{stem}_original.{}", ext.to_string_lossy()),
        None => format!("{stem}_original"),
    };
    destination.with_file_name(name)
}

/// Turn the source argument into a local path, downloading URLs first.
pub fn resolve_source(source: &str, destination: &Path) -> Result<PathBuf, PipelineError> {
    if !is_remote(source) {
        return Ok(PathBuf::from(source));
    }
    let response = reqwest::blocking::get(source)?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(PipelineError::NotFound(source.to_string()));
    }
    let body = response.bytes()?;
    let local = original_download_path(destination);
    std::fs::write(&local, &body)?;
    tracing::debug!(url = source, path = %local.display(), size = body.len(), "source downloaded");
    Ok(local)
}
