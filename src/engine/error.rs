//! Failure taxonomy for engine calls.
//!
//! Each variant names the category of the primitive that failed. The detailed
//! reason lives in the thread-local error buffer (see
//! [`error_buffer`](super::error_buffer)), which callers fetch separately.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to initialize engine")]
    Initialize,
    #[error("Failed to configure engine (call initialize first)")]
    Configure,
    #[error("Failed to load image")]
    Load,
    #[error("Failed to save image")]
    Save,
    #[error("Failed to embed image")]
    Embed,
    #[error("Failed to crop image")]
    Crop,
    #[error("Failed to shrink image")]
    Shrink,
    #[error("Failed to reduce image")]
    Reduce,
    #[error("Failed to resize image")]
    Resize,
    #[error("Failed to apply affine transform")]
    Affine,
    #[error("Failed to blur image")]
    Blur,
    #[error("Failed to sharpen image")]
    Sharpen,
    #[error("Failed to flatten image")]
    Flatten,
    #[error("Failed to convert colourspace")]
    Colourspace,
    #[error("Failed to apply ICC transform")]
    IccTransform,
}
