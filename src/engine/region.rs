//! Addressable pixel windows over an image.

use super::raw::RawImage;
use super::types::BandFormat;
use super::{Status, record};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A prepared window of 8-bit samples.
///
/// The region keeps its image alive. Memory images need no copy to be
/// prepared, so [`addr`](Region::addr) indexes the image's own buffer.
#[derive(Debug)]
pub struct Region {
    image: Arc<RawImage>,
    valid: Rect,
}

impl Region {
    pub(crate) fn new(image: Arc<RawImage>) -> Self {
        Self {
            image,
            valid: Rect::default(),
        }
    }

    /// Make `rect` readable.
    pub(crate) fn prepare(&mut self, rect: Rect) -> Status<()> {
        if self.image.format() != BandFormat::UChar {
            return Err(record("region", "only 8-bit images can be prepared"));
        }
        let bounds = Rect::new(0, 0, self.image.width() as i32, self.image.height() as i32);
        if rect.is_empty() || !bounds.contains(&rect) {
            return Err(record("region", format!("{rect:?} is outside {bounds:?}")));
        }
        self.valid = rect;
        Ok(())
    }

    pub fn valid(&self) -> Rect {
        self.valid
    }

    /// Samples per pixel.
    pub fn n_elements(&self) -> usize {
        self.image.bands() as usize
    }

    /// Band samples of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Coordinates outside the image panic on the slice index.
    pub fn addr(&self, x: u32, y: u32) -> &[u8] {
        debug_assert!(
            (x as i32) >= self.valid.left
                && (x as i32) < self.valid.right()
                && (y as i32) >= self.valid.top
                && (y as i32) < self.valid.bottom(),
            "({x}, {y}) outside prepared region {:?}",
            self.valid
        );
        let bands = self.n_elements();
        let offset = (y as usize * self.image.width() as usize + x as usize) * bands;
        let data = self.image.uchar().unwrap_or(&[]);
        &data[offset..offset + bands]
    }
}
