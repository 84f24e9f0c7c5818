//! Per-pixel read views over engine images.
//!
//! A view borrows an [`Image`] and checks once, at construction, that the
//! image has the band count, sample depth and interpretation the view reads.
//! Nothing is converted implicitly: a mismatch is an [`AdapterError`].
//!
//! The pixel region is prepared lazily, over the full image, on the first
//! [`pixel_at`](PixelView::pixel_at), and reused for every later call.
//! Coordinates are not bounds-checked beyond the slice index, so reading
//! outside the image panics.
//!
//! | View | Bands | Interpretation | Pixel |
//! |---|---|---|---|
//! | [`RgbaView`] | 3 or 4 | sRGB, RGB | `image::Rgba<u8>` (opaque when 3 bands) |
//! | [`CmykView`] | 4 | CMYK | [`Cmyk`] |
//! | [`GrayView`] | 1 | B_W | `image::Luma<u8>` |

use super::handle::Image;
use crate::engine::{BandFormat, Interpretation, Rect, Region};
use image::{Luma, Rgba, RgbaImage};
use std::cell::OnceCell;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("{view} view needs {expected} bands, image has {actual}")]
    BandCount {
        view: &'static str,
        expected: &'static str,
        actual: u32,
    },
    #[error("{view} view needs 8-bit samples, image has {actual:?}")]
    Format {
        view: &'static str,
        actual: BandFormat,
    },
    #[error("{view} view needs {expected} interpretation, image is {actual}")]
    Interpretation {
        view: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Failed to prepare pixel region")]
    Region,
}

/// Four-ink pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cmyk {
    pub c: u8,
    pub m: u8,
    pub y: u8,
    pub k: u8,
}

/// Read access shared by every view.
pub trait PixelView {
    type Pixel;

    fn bounds(&self) -> Rect;

    /// The pixel at `(x, y)`. The first call prepares the region.
    fn pixel_at(&self, x: u32, y: u32) -> Result<Self::Pixel, AdapterError>;
}

struct Prepared {
    region: Region,
    alpha: bool,
}

/// The borrowed image plus its lazily prepared region.
struct Materialized<'a> {
    image: &'a Image,
    prepared: OnceCell<Prepared>,
}

struct Expected {
    view: &'static str,
    bands: &'static [u32],
    bands_text: &'static str,
    interpretations: &'static [Interpretation],
    interpretation_text: &'static str,
}

impl<'a> Materialized<'a> {
    fn bind(image: &'a Image, expected: &Expected) -> Result<Self, AdapterError> {
        if !expected.bands.contains(&image.bands()) {
            return Err(AdapterError::BandCount {
                view: expected.view,
                expected: expected.bands_text,
                actual: image.bands(),
            });
        }
        if image.format() != BandFormat::UChar {
            return Err(AdapterError::Format {
                view: expected.view,
                actual: image.format(),
            });
        }
        if !expected.interpretations.contains(&image.interpretation()) {
            return Err(AdapterError::Interpretation {
                view: expected.view,
                expected: expected.interpretation_text,
                actual: image.interpretation().name(),
            });
        }
        Ok(Self {
            image,
            prepared: OnceCell::new(),
        })
    }

    fn prepared(&self) -> Result<&Prepared, AdapterError> {
        if let Some(prepared) = self.prepared.get() {
            return Ok(prepared);
        }
        let mut region = Region::new(self.image.shared());
        region
            .prepare(self.image.bounds())
            .map_err(|_| AdapterError::Region)?;
        tracing::trace!(valid = ?region.valid(), "pixel region prepared");
        let alpha = region.n_elements() == 4;
        Ok(self.prepared.get_or_init(|| Prepared { region, alpha }))
    }

    fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }

    fn release(&mut self) {
        if self.prepared.take().is_some() {
            tracing::trace!("pixel region released");
        }
    }
}

// =========================================================================
// RGB(A)
// =========================================================================

/// sRGB or RGB pixels, with or without alpha.
pub struct RgbaView<'a> {
    inner: Materialized<'a>,
}

impl<'a> RgbaView<'a> {
    pub fn new(image: &'a Image) -> Result<Self, AdapterError> {
        let expected = Expected {
            view: "RGBA",
            bands: &[3, 4],
            bands_text: "3 or 4",
            interpretations: &[Interpretation::Srgb, Interpretation::Rgb],
            interpretation_text: "srgb or rgb",
        };
        Ok(Self {
            inner: Materialized::bind(image, &expected)?,
        })
    }

    /// Whether a fourth band is present. Known once the region is prepared.
    pub fn has_alpha(&self) -> Option<bool> {
        self.inner.prepared.get().map(|p| p.alpha)
    }

    pub fn is_prepared(&self) -> bool {
        self.inner.is_prepared()
    }

    /// Copy every pixel into an `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, AdapterError> {
        let bounds = self.bounds();
        let (width, height) = (bounds.width as u32, bounds.height as u32);
        let mut out = RgbaImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                out.put_pixel(x, y, self.pixel_at(x, y)?);
            }
        }
        Ok(out)
    }

    pub fn release(mut self) {
        self.inner.release();
    }
}

impl PixelView for RgbaView<'_> {
    type Pixel = Rgba<u8>;

    fn bounds(&self) -> Rect {
        self.inner.image.bounds()
    }

    fn pixel_at(&self, x: u32, y: u32) -> Result<Rgba<u8>, AdapterError> {
        let prepared = self.inner.prepared()?;
        let px = prepared.region.addr(x, y);
        let alpha = if prepared.alpha { px[3] } else { u8::MAX };
        Ok(Rgba([px[0], px[1], px[2], alpha]))
    }
}

// =========================================================================
// CMYK
// =========================================================================

pub struct CmykView<'a> {
    inner: Materialized<'a>,
}

impl<'a> CmykView<'a> {
    pub fn new(image: &'a Image) -> Result<Self, AdapterError> {
        let expected = Expected {
            view: "CMYK",
            bands: &[4],
            bands_text: "4",
            interpretations: &[Interpretation::Cmyk],
            interpretation_text: "cmyk",
        };
        Ok(Self {
            inner: Materialized::bind(image, &expected)?,
        })
    }

    pub fn release(mut self) {
        self.inner.release();
    }
}

impl PixelView for CmykView<'_> {
    type Pixel = Cmyk;

    fn bounds(&self) -> Rect {
        self.inner.image.bounds()
    }

    fn pixel_at(&self, x: u32, y: u32) -> Result<Cmyk, AdapterError> {
        let px = self.inner.prepared()?.region.addr(x, y);
        Ok(Cmyk {
            c: px[0],
            m: px[1],
            y: px[2],
            k: px[3],
        })
    }
}

// =========================================================================
// Gray
// =========================================================================

pub struct GrayView<'a> {
    inner: Materialized<'a>,
}

impl<'a> GrayView<'a> {
    pub fn new(image: &'a Image) -> Result<Self, AdapterError> {
        let expected = Expected {
            view: "gray",
            bands: &[1],
            bands_text: "1",
            interpretations: &[Interpretation::BW],
            interpretation_text: "b-w",
        };
        Ok(Self {
            inner: Materialized::bind(image, &expected)?,
        })
    }

    pub fn release(mut self) {
        self.inner.release();
    }
}

impl PixelView for GrayView<'_> {
    type Pixel = Luma<u8>;

    fn bounds(&self) -> Rect {
        self.inner.image.bounds()
    }

    fn pixel_at(&self, x: u32, y: u32) -> Result<Luma<u8>, AdapterError> {
        let px = self.inner.prepared()?.region.addr(x, y);
        Ok(Luma([px[0]]))
    }
}
