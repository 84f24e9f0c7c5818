//! Operation dispatcher: one function per engine primitive.
//!
//! Every function follows the same shape. Missing options become the record's
//! defaults, the record is translated, the primitive runs, and a success is
//! wrapped into a new [`Image`] that shares the input's backing buffer. A
//! failure maps to the operation's [`EngineError`] variant and leaves the
//! input untouched; the reason stays in [`crate::engine::error_buffer`].
//! Inputs are only borrowed, so callers release them when they choose.

use super::handle::Image;
use super::options::{
    AffineOptions, BlurOptions, ColourspaceOptions, DecodeOptions, EmbedOptions, FlattenOptions,
    GifDecodeOptions, IccTransformOptions, JpegDecodeOptions, JpegEncodeOptions, PngEncodeOptions,
    SharpenOptions, SimilarityOptions, WebpDecodeOptions, WebpEncodeOptions,
};
use crate::engine::load::Source;
use crate::engine::{
    EngineError, Interpretation, Kernel, RawImage, Rect, Status, colour, filter, geometry, load,
    record, save,
};
use std::path::Path;
use std::sync::Arc;

fn dispatch(
    input: &Image,
    error: EngineError,
    call: impl FnOnce(&RawImage) -> Status<Arc<RawImage>>,
) -> Result<Image, EngineError> {
    call(input.raw())
        .map(|raw| input.derive(raw))
        .map_err(|_| error)
}

fn from_bytes(
    bytes: Arc<[u8]>,
    call: impl FnOnce(Source<'_>) -> Status<Arc<RawImage>>,
) -> Result<Image, EngineError> {
    let raw = call(Source::Buffer(&bytes)).map_err(|_| EngineError::Load)?;
    Ok(Image::new(raw, Some(bytes)))
}

fn from_file(
    path: &Path,
    call: impl FnOnce(Source<'_>) -> Status<Arc<RawImage>>,
) -> Result<Image, EngineError> {
    let raw = call(Source::File(path)).map_err(|_| EngineError::Load)?;
    Ok(Image::new(raw, None))
}

fn write_file(domain: &str, path: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    std::fs::write(path, bytes).map_err(|e| {
        record(domain, format!("{}: {e}", path.display()));
        EngineError::Save
    })
}

// =========================================================================
// Decode
// =========================================================================

pub fn decode_jpeg_bytes(
    bytes: impl Into<Arc<[u8]>>,
    options: Option<&JpegDecodeOptions>,
) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| JpegDecodeOptions::default().translate(), JpegDecodeOptions::translate);
    from_bytes(bytes.into(), |source| load::jpegload(source, &args))
}

pub fn decode_jpeg_file(path: &Path, options: Option<&JpegDecodeOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| JpegDecodeOptions::default().translate(), JpegDecodeOptions::translate);
    from_file(path, |source| load::jpegload(source, &args))
}

pub fn decode_png_bytes(
    bytes: impl Into<Arc<[u8]>>,
    options: Option<&DecodeOptions>,
) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| DecodeOptions::default().translate(), DecodeOptions::translate);
    from_bytes(bytes.into(), |source| load::pngload(source, &args))
}

pub fn decode_png_file(path: &Path, options: Option<&DecodeOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| DecodeOptions::default().translate(), DecodeOptions::translate);
    from_file(path, |source| load::pngload(source, &args))
}

pub fn decode_webp_bytes(
    bytes: impl Into<Arc<[u8]>>,
    options: Option<&WebpDecodeOptions>,
) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| WebpDecodeOptions::default().translate(), WebpDecodeOptions::translate);
    from_bytes(bytes.into(), |source| load::webpload(source, &args))
}

pub fn decode_webp_file(path: &Path, options: Option<&WebpDecodeOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| WebpDecodeOptions::default().translate(), WebpDecodeOptions::translate);
    from_file(path, |source| load::webpload(source, &args))
}

pub fn decode_gif_bytes(
    bytes: impl Into<Arc<[u8]>>,
    options: Option<&GifDecodeOptions>,
) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| GifDecodeOptions::default().translate(), GifDecodeOptions::translate);
    from_bytes(bytes.into(), |source| load::gifload(source, &args))
}

pub fn decode_gif_file(path: &Path, options: Option<&GifDecodeOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| GifDecodeOptions::default().translate(), GifDecodeOptions::translate);
    from_file(path, |source| load::gifload(source, &args))
}

/// Wrap raw interleaved 8-bit samples.
pub fn decode_memory(
    data: Vec<u8>,
    width: u32,
    height: u32,
    bands: u32,
    interpretation: Interpretation,
) -> Result<Image, EngineError> {
    let raw = load::load_memory(data, width, height, bands, interpretation)
        .map_err(|_| EngineError::Load)?;
    Ok(Image::new(raw, None))
}

// =========================================================================
// Encode
// =========================================================================

pub fn encode_jpeg_bytes(image: &Image, options: Option<&JpegEncodeOptions>) -> Result<Vec<u8>, EngineError> {
    let args = options.map_or_else(|| JpegEncodeOptions::default().translate(), JpegEncodeOptions::translate);
    save::jpegsave_buffer(image.raw(), &args).map_err(|_| EngineError::Save)
}

pub fn encode_jpeg_file(
    image: &Image,
    path: &Path,
    options: Option<&JpegEncodeOptions>,
) -> Result<(), EngineError> {
    let bytes = encode_jpeg_bytes(image, options)?;
    write_file("jpegsave", path, &bytes)
}

pub fn encode_png_bytes(image: &Image, options: Option<&PngEncodeOptions>) -> Result<Vec<u8>, EngineError> {
    let args = options.map_or_else(|| PngEncodeOptions::default().translate(), PngEncodeOptions::translate);
    save::pngsave_buffer(image.raw(), &args).map_err(|_| EngineError::Save)
}

pub fn encode_png_file(
    image: &Image,
    path: &Path,
    options: Option<&PngEncodeOptions>,
) -> Result<(), EngineError> {
    let bytes = encode_png_bytes(image, options)?;
    write_file("pngsave", path, &bytes)
}

pub fn encode_webp_bytes(image: &Image, options: Option<&WebpEncodeOptions>) -> Result<Vec<u8>, EngineError> {
    let args = options.map_or_else(|| WebpEncodeOptions::default().translate(), WebpEncodeOptions::translate);
    save::webpsave_buffer(image.raw(), &args).map_err(|_| EngineError::Save)
}

pub fn encode_webp_file(
    image: &Image,
    path: &Path,
    options: Option<&WebpEncodeOptions>,
) -> Result<(), EngineError> {
    let bytes = encode_webp_bytes(image, options)?;
    write_file("webpsave", path, &bytes)
}

// =========================================================================
// Geometry
// =========================================================================

/// Place the image at `(x, y)` inside a `width` × `height` canvas.
pub fn embed(
    image: &Image,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    options: Option<&EmbedOptions>,
) -> Result<Image, EngineError> {
    let args = options.map_or_else(
        || EmbedOptions::default().translate(x, y, width, height),
        |o| o.translate(x, y, width, height),
    );
    dispatch(image, EngineError::Embed, |raw| geometry::embed(raw, &args))
}

/// Extract a rectangle. The result's origin is `(0, 0)`.
pub fn crop(image: &Image, left: i32, top: i32, width: i32, height: i32) -> Result<Image, EngineError> {
    let area = Rect::new(left, top, width, height);
    dispatch(image, EngineError::Crop, |raw| geometry::extract_area(raw, area))
}

pub fn shrink(image: &Image, hshrink: f64, vshrink: f64) -> Result<Image, EngineError> {
    dispatch(image, EngineError::Shrink, |raw| geometry::shrink(raw, hshrink, vshrink))
}

pub fn shrink_h(image: &Image, hshrink: f64) -> Result<Image, EngineError> {
    shrink(image, hshrink, 1.0)
}

pub fn shrink_v(image: &Image, vshrink: f64) -> Result<Image, EngineError> {
    shrink(image, 1.0, vshrink)
}

pub fn reduce(image: &Image, hshrink: f64, vshrink: f64, kernel: Kernel) -> Result<Image, EngineError> {
    dispatch(image, EngineError::Reduce, |raw| {
        geometry::reduce(raw, hshrink, vshrink, kernel)
    })
}

pub fn reduce_h(image: &Image, hshrink: f64, kernel: Kernel) -> Result<Image, EngineError> {
    reduce(image, hshrink, 1.0, kernel)
}

pub fn reduce_v(image: &Image, vshrink: f64, kernel: Kernel) -> Result<Image, EngineError> {
    reduce(image, 1.0, vshrink, kernel)
}

/// Scale by `scale`, and vertically by `vscale` when given.
pub fn resize(
    image: &Image,
    scale: f64,
    vscale: Option<f64>,
    kernel: Kernel,
) -> Result<Image, EngineError> {
    let vscale = vscale.unwrap_or(scale);
    dispatch(image, EngineError::Resize, |raw| {
        geometry::resize(raw, scale, vscale, kernel)
    })
}

/// Apply the 2×2 matrix `[a, b, c, d]`.
pub fn affine(image: &Image, matrix: [f64; 4], options: Option<&AffineOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(
        || AffineOptions::default().translate(matrix),
        |o| o.translate(matrix),
    );
    dispatch(image, EngineError::Affine, |raw| geometry::affine(raw, &args))
}

pub fn similarity(image: &Image, options: Option<&SimilarityOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| SimilarityOptions::default().translate(), SimilarityOptions::translate);
    dispatch(image, EngineError::Affine, |raw| geometry::similarity(raw, &args))
}

// =========================================================================
// Filters and colour
// =========================================================================

pub fn blur(image: &Image, sigma: f64, options: Option<&BlurOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| BlurOptions::default().translate(sigma), |o| o.translate(sigma));
    dispatch(image, EngineError::Blur, |raw| filter::gaussblur(raw, &args))
}

pub fn sharpen(image: &Image, options: Option<&SharpenOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| SharpenOptions::default().translate(), SharpenOptions::translate);
    dispatch(image, EngineError::Sharpen, |raw| filter::sharpen(raw, &args))
}

pub fn flatten(image: &Image, options: Option<&FlattenOptions>) -> Result<Image, EngineError> {
    let args = options.map_or_else(|| FlattenOptions::default().translate(), FlattenOptions::translate);
    dispatch(image, EngineError::Flatten, |raw| colour::flatten(raw, &args))
}

pub fn colourspace(
    image: &Image,
    space: Interpretation,
    options: Option<&ColourspaceOptions>,
) -> Result<Image, EngineError> {
    let current = image.interpretation();
    let args = options.map_or_else(
        || ColourspaceOptions::default().translate(space, current),
        |o| o.translate(space, current),
    );
    dispatch(image, EngineError::Colourspace, |raw| colour::colourspace(raw, &args))
}

pub fn colourspace_is_supported(image: &Image) -> bool {
    colour::colourspace_is_supported(image.raw())
}

/// Transform to `output_profile`: `"srgb"` or a path to an ICC file.
pub fn icc_transform(
    image: &Image,
    output_profile: &str,
    options: Option<&IccTransformOptions>,
) -> Result<Image, EngineError> {
    let args = options.map_or_else(
        || IccTransformOptions::default().translate(output_profile),
        |o| o.translate(output_profile),
    );
    dispatch(image, EngineError::IccTransform, |raw| colour::icc_transform(raw, &args))
}
