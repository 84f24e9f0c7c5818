//! Loaders: encoded bytes (or a file) in, engine image out.
//!
//! Decoding is delegated to the `image` crate. Results are memoized on the
//! SHA-256 of the source bytes plus the argument record, or on the path, size
//! and modification time for file loads, which also count against the cache's
//! open-file limit.

use super::cache::{content_key, memoize};
use super::raw::RawImage;
use super::types::{Access, Interpretation};
use super::{Status, ensure_running, geometry, record};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::fmt::Debug;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Where a loader reads from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Buffer(&'a [u8]),
    File(&'a Path),
}

/// Hints common to every loader. Recorded, not acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoadArgs {
    pub access: Access,
    pub disc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JpegLoadArgs {
    pub base: LoadArgs,
    /// Integer shrink-on-load: 1, 2, 4 or 8.
    pub shrink: u32,
    /// Reject truncated streams instead of decoding what is there.
    pub fail: bool,
    pub autorotate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GifLoadArgs {
    pub base: LoadArgs,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WebpLoadArgs {
    pub base: LoadArgs,
    pub shrink: u32,
}

pub(crate) fn jpegload(source: Source<'_>, args: &JpegLoadArgs) -> Status<Arc<RawImage>> {
    load_with("jpegload", source, args, |bytes| decode_jpeg(bytes, args))
}

pub(crate) fn pngload(source: Source<'_>, args: &LoadArgs) -> Status<Arc<RawImage>> {
    load_with("pngload", source, args, |bytes| {
        let (image, icc) = decode_as("pngload", bytes, ImageFormat::Png, false)?;
        Ok(from_dynamic(image).with_icc(icc))
    })
}

pub(crate) fn webpload(source: Source<'_>, args: &WebpLoadArgs) -> Status<Arc<RawImage>> {
    load_with("webpload", source, args, |bytes| {
        if args.shrink < 1 {
            return Err(record("webpload", "shrink must be at least 1"));
        }
        let (image, icc) = decode_as("webpload", bytes, ImageFormat::WebP, false)?;
        shrink_on_load(from_dynamic(image).with_icc(icc), args.shrink)
    })
}

pub(crate) fn gifload(source: Source<'_>, args: &GifLoadArgs) -> Status<Arc<RawImage>> {
    load_with("gifload", source, args, |bytes| decode_gif(bytes, args.page))
}

/// Wrap raw interleaved 8-bit samples. Not cached.
pub(crate) fn load_memory(
    data: Vec<u8>,
    width: u32,
    height: u32,
    bands: u32,
    interpretation: Interpretation,
) -> Status<Arc<RawImage>> {
    ensure_running("memory")?;
    if width == 0 || height == 0 || bands == 0 {
        return Err(record("memory", "width, height and bands must be non-zero"));
    }
    let expected = width as usize * height as usize * bands as usize;
    if data.len() != expected {
        return Err(record(
            "memory",
            format!("expected {expected} bytes, got {}", data.len()),
        ));
    }
    Ok(Arc::new(RawImage::new_uchar(
        width,
        height,
        bands,
        interpretation,
        data,
    )))
}

fn load_with<A: Debug>(
    domain: &str,
    source: Source<'_>,
    args: &A,
    decode: impl FnOnce(&[u8]) -> Status<RawImage>,
) -> Status<Arc<RawImage>> {
    ensure_running(domain)?;
    match source {
        Source::Buffer(bytes) => memoize(content_key(domain, bytes, args), false, || decode(bytes)),
        Source::File(path) => {
            let stamp = std::fs::metadata(path)
                .map(|m| (m.len(), m.modified().ok()))
                .map_err(|e| record(domain, format!("{}: {e}", path.display())))?;
            let key = format!("{domain}:{}:{stamp:?}:{args:?}", path.display());
            memoize(key, true, || {
                let bytes = std::fs::read(path)
                    .map_err(|e| record(domain, format!("{}: {e}", path.display())))?;
                decode(&bytes)
            })
        }
    }
}

fn decode_jpeg(bytes: &[u8], args: &JpegLoadArgs) -> Status<RawImage> {
    const DOMAIN: &str = "jpegload";
    if image::guess_format(bytes).ok() != Some(ImageFormat::Jpeg) {
        return Err(record(DOMAIN, "not a JPEG image"));
    }
    if !matches!(args.shrink, 1 | 2 | 4 | 8) {
        return Err(record(DOMAIN, format!("shrink must be 1, 2, 4 or 8, not {}", args.shrink)));
    }
    if args.fail && !bytes.ends_with(&[0xFF, 0xD9]) {
        return Err(record(DOMAIN, "premature end of JPEG image"));
    }
    let (image, icc) = decode_as(DOMAIN, bytes, ImageFormat::Jpeg, args.autorotate)?;
    shrink_on_load(from_dynamic(image).with_icc(icc), args.shrink)
}

fn decode_gif(bytes: &[u8], page: u32) -> Status<RawImage> {
    const DOMAIN: &str = "gifload";
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(|e| record(DOMAIN, e))?;
    let frame = decoder
        .into_frames()
        .nth(page as usize)
        .ok_or_else(|| record(DOMAIN, format!("page {page} out of range")))?
        .map_err(|e| record(DOMAIN, e))?;
    let buffer = frame.into_buffer();
    let (width, height) = buffer.dimensions();
    Ok(RawImage::new_uchar(
        width,
        height,
        4,
        Interpretation::Srgb,
        buffer.into_raw(),
    ))
}

fn decode_as(
    domain: &str,
    bytes: &[u8],
    format: ImageFormat,
    autorotate: bool,
) -> Status<(DynamicImage, Option<Arc<Vec<u8>>>)> {
    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format)
        .into_decoder()
        .map_err(|e| record(domain, e))?;
    let icc = decoder.icc_profile().ok().flatten().map(Arc::new);
    let orientation = if autorotate {
        decoder.orientation().ok()
    } else {
        None
    };
    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| record(domain, e))?;
    if let Some(orientation) = orientation {
        image.apply_orientation(orientation);
    }
    Ok((image, icc))
}

fn shrink_on_load(image: RawImage, shrink: u32) -> Status<RawImage> {
    if shrink <= 1 {
        return Ok(image);
    }
    let icc = image.icc().cloned();
    Ok(geometry::box_shrink(&image, shrink, shrink)?.with_icc(icc))
}

/// Convert a decoded raster into 8-bit engine samples.
pub(crate) fn from_dynamic(image: DynamicImage) -> RawImage {
    let (width, height) = (image.width(), image.height());
    let (bands, interpretation, data) = match image {
        DynamicImage::ImageLuma8(buf) => (1, Interpretation::BW, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, Interpretation::BW, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, Interpretation::Srgb, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, Interpretation::Srgb, buf.into_raw()),
        other => {
            let color = other.color();
            match (color.has_color(), color.has_alpha()) {
                (true, true) => (4, Interpretation::Srgb, other.to_rgba8().into_raw()),
                (true, false) => (3, Interpretation::Srgb, other.to_rgb8().into_raw()),
                (false, true) => (2, Interpretation::BW, other.to_luma_alpha8().into_raw()),
                (false, false) => (1, Interpretation::BW, other.to_luma8().into_raw()),
            }
        }
    };
    RawImage::new_uchar(width, height, bands, interpretation, data)
}
