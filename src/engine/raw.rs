//! Immutable image values held by the engine.
//!
//! A [`RawImage`] is never mutated after construction. Operations read their
//! input and build a fresh value, so the same input can feed any number of
//! derived images. Pixel storage is reference counted and shared wherever an
//! operation only changes metadata.

use super::types::{BandFormat, Interpretation};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Interleaved band samples.
#[derive(Debug, Clone)]
pub enum Pixels {
    UChar(Arc<Vec<u8>>),
    Float(Arc<Vec<f32>>),
}

impl Pixels {
    pub fn format(&self) -> BandFormat {
        match self {
            Pixels::UChar(_) => BandFormat::UChar,
            Pixels::Float(_) => BandFormat::Float,
        }
    }

    pub fn sample_count(&self) -> usize {
        match self {
            Pixels::UChar(data) => data.len(),
            Pixels::Float(data) => data.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            Pixels::UChar(data) => data.len(),
            Pixels::Float(data) => data.len() * std::mem::size_of::<f32>(),
        }
    }
}

/// Sample types the geometric primitives are generic over.
pub(crate) trait Sample: Copy + Default + Send + Sync + 'static {
    fn from_f64(value: f64) -> Self;
    fn to_f32(self) -> f32;
}

impl Sample for u8 {
    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, 255.0) as u8
    }

    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f32(self) -> f32 {
        self
    }
}

#[derive(Debug)]
pub struct RawImage {
    id: u64,
    width: u32,
    height: u32,
    bands: u32,
    interpretation: Interpretation,
    pixels: Pixels,
    icc: Option<Arc<Vec<u8>>>,
}

impl RawImage {
    pub(crate) fn from_pixels(
        width: u32,
        height: u32,
        bands: u32,
        interpretation: Interpretation,
        pixels: Pixels,
    ) -> RawImage {
        debug_assert_eq!(
            pixels.sample_count(),
            width as usize * height as usize * bands as usize
        );
        RawImage {
            id: next_id(),
            width,
            height,
            bands,
            interpretation,
            pixels,
            icc: None,
        }
    }

    pub(crate) fn new_uchar(
        width: u32,
        height: u32,
        bands: u32,
        interpretation: Interpretation,
        data: Vec<u8>,
    ) -> RawImage {
        Self::from_pixels(width, height, bands, interpretation, Pixels::UChar(Arc::new(data)))
    }

    pub(crate) fn new_float(
        width: u32,
        height: u32,
        bands: u32,
        interpretation: Interpretation,
        data: Vec<f32>,
    ) -> RawImage {
        Self::from_pixels(width, height, bands, interpretation, Pixels::Float(Arc::new(data)))
    }

    pub(crate) fn with_icc(mut self, icc: Option<Arc<Vec<u8>>>) -> RawImage {
        self.icc = icc;
        self
    }

    /// A new value with the same pixels and no embedded profile.
    pub(crate) fn without_icc(&self) -> RawImage {
        RawImage {
            id: next_id(),
            width: self.width,
            height: self.height,
            bands: self.bands,
            interpretation: self.interpretation,
            pixels: self.pixels.clone(),
            icc: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bands(&self) -> u32 {
        self.bands
    }

    pub fn format(&self) -> BandFormat {
        self.pixels.format()
    }

    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn icc(&self) -> Option<&Arc<Vec<u8>>> {
        self.icc.as_ref()
    }

    pub fn uchar(&self) -> Option<&[u8]> {
        match &self.pixels {
            Pixels::UChar(data) => Some(data.as_slice()),
            Pixels::Float(_) => None,
        }
    }

    pub fn float(&self) -> Option<&[f32]> {
        match &self.pixels {
            Pixels::Float(data) => Some(data.as_slice()),
            Pixels::UChar(_) => None,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.byte_len() + self.icc.as_ref().map_or(0, |icc| icc.len())
    }

    /// Whether the last band is an alpha channel.
    pub fn has_alpha(&self) -> bool {
        match self.bands {
            2 => self.interpretation == Interpretation::BW,
            4 => self.interpretation != Interpretation::Cmyk,
            n => n > 4,
        }
    }

    pub(crate) fn row_len(&self) -> usize {
        self.width as usize * self.bands as usize
    }
}
