//! Owned handles to engine images.
//!
//! An [`Image`] is the only way the rest of the crate refers to an engine
//! image. It cannot be cloned, and [`Image::release`] consumes it, so a
//! released handle cannot be used again: the compiler rejects it. Dropping a
//! handle without calling `release` performs the same release.
//!
//! Handles decoded from a caller-supplied buffer keep that buffer alive, and
//! every image derived from them shares the same reference, so derived images
//! stay valid after the caller lets go of the source bytes.

use super::backend::Dimensions;
use crate::engine::{BandFormat, Interpretation, RawImage, Rect};
use std::sync::Arc;

#[derive(Debug)]
pub struct Image {
    raw: Arc<RawImage>,
    backing: Option<Arc<[u8]>>,
}

impl Image {
    pub(crate) fn new(raw: Arc<RawImage>, backing: Option<Arc<[u8]>>) -> Self {
        tracing::trace!(id = raw.id(), "image acquired");
        Self { raw, backing }
    }

    /// Wrap the output of an operation on `self`, sharing its backing buffer.
    pub(crate) fn derive(&self, raw: Arc<RawImage>) -> Image {
        Image::new(raw, self.backing.clone())
    }

    pub(crate) fn raw(&self) -> &RawImage {
        &self.raw
    }

    pub(crate) fn shared(&self) -> Arc<RawImage> {
        Arc::clone(&self.raw)
    }

    /// Give the image back to the engine.
    pub fn release(self) {
        drop(self);
    }

    /// The image rectangle, at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.raw.width() as i32, self.raw.height() as i32)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.raw.width(),
            height: self.raw.height(),
        }
    }

    pub fn bands(&self) -> u32 {
        self.raw.bands()
    }

    pub fn interpretation(&self) -> Interpretation {
        self.raw.interpretation()
    }

    pub fn format(&self) -> BandFormat {
        self.raw.format()
    }

    pub fn has_alpha(&self) -> bool {
        self.raw.has_alpha()
    }

    pub fn has_profile(&self) -> bool {
        self.raw.icc().is_some()
    }

    /// A new handle over the same pixels with the embedded profile dropped.
    pub fn remove_profile(&self) -> Image {
        self.derive(Arc::new(self.raw.without_icc()))
    }

    /// Strong count of the backing buffer, 0 when there is none.
    pub fn backing_buffer_refs(&self) -> usize {
        self.backing.as_ref().map_or(0, Arc::strong_count)
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        tracing::trace!(id = self.raw.id(), "image released");
    }
}
