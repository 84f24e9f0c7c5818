//! Geometric primitives: embed, extract, shrink, reduce, resize, affine.
//!
//! Row loops run on the engine's worker pool. Resampling with a kernel is
//! handed to `fast_image_resize`, with alpha premultiplied around the pass.

use super::args::{ArrayDouble, ArrayInt, Interpolate, InterpolateKind};
use super::cache::{memoize, operation_key};
use super::raw::{Pixels, RawImage, Sample};
use super::region::Rect;
use super::types::{Extend, Kernel};
use super::{Status, ensure_running, record, run};
use fast_image_resize::images::Image as FirImage;
use fast_image_resize::{FilterType, MulDiv, PixelType, ResizeAlg, ResizeOptions, Resizer};
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug)]
pub struct EmbedArgs {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub extend: Extend,
    pub background: Option<ArrayDouble>,
}

#[derive(Debug)]
pub struct AffineArgs {
    pub matrix: [f64; 4],
    pub interpolate: Interpolate,
    /// `[left, top, width, height]` in output space.
    pub output_area: Option<ArrayInt>,
    pub idx: f64,
    pub idy: f64,
    pub odx: f64,
    pub ody: f64,
}

#[derive(Debug)]
pub struct SimilarityArgs {
    pub scale: f64,
    /// Degrees, counter-clockwise in image space.
    pub angle: f64,
    pub interpolate: Interpolate,
    pub idx: f64,
    pub idy: f64,
    pub odx: f64,
    pub ody: f64,
}

pub(crate) fn embed(input: &RawImage, args: &EmbedArgs) -> Status<Arc<RawImage>> {
    ensure_running("embed")?;
    memoize(operation_key("embed", input, args), false, || {
        embed_raw(input, args)
    })
}

pub(crate) fn extract_area(input: &RawImage, area: Rect) -> Status<Arc<RawImage>> {
    ensure_running("extract_area")?;
    let bounds = Rect::new(0, 0, input.width() as i32, input.height() as i32);
    if area.is_empty() || !bounds.contains(&area) {
        return Err(record("extract_area", "bad extract area"));
    }
    memoize(operation_key("extract_area", input, &area), false, || {
        let pixels = match input.pixels() {
            Pixels::UChar(data) => Pixels::UChar(Arc::new(extract_samples(data, input, area))),
            Pixels::Float(data) => Pixels::Float(Arc::new(extract_samples(data, input, area))),
        };
        Ok(RawImage::from_pixels(
            area.width as u32,
            area.height as u32,
            input.bands(),
            input.interpretation(),
            pixels,
        )
        .with_icc(input.icc().cloned()))
    })
}

/// Block-average shrink. Fractional factors finish with a Lanczos3 reduce.
pub(crate) fn shrink(input: &RawImage, hshrink: f64, vshrink: f64) -> Status<Arc<RawImage>> {
    ensure_running("shrink")?;
    if !(hshrink >= 1.0 && vshrink >= 1.0) {
        return Err(record("shrink", "shrink factors must be >= 1"));
    }
    let args = (hshrink, vshrink);
    memoize(operation_key("shrink", input, &args), false, || {
        let (xs, ys) = (hshrink.floor() as u32, vshrink.floor() as u32);
        let boxed = box_shrink(input, xs, ys)?;
        if hshrink.fract() == 0.0 && vshrink.fract() == 0.0 {
            return Ok(boxed.with_icc(input.icc().cloned()));
        }
        let target = (
            target_dimension(input.width(), 1.0 / hshrink),
            target_dimension(input.height(), 1.0 / vshrink),
        );
        if (boxed.width(), boxed.height()) == target {
            return Ok(boxed.with_icc(input.icc().cloned()));
        }
        resample("shrink", &boxed, target.0, target.1, Kernel::Lanczos3)
    })
}

pub(crate) fn reduce(
    input: &RawImage,
    hshrink: f64,
    vshrink: f64,
    kernel: Kernel,
) -> Status<Arc<RawImage>> {
    ensure_running("reduce")?;
    if !(hshrink >= 1.0 && vshrink >= 1.0) {
        return Err(record("reduce", "reduce factors must be >= 1"));
    }
    let args = (hshrink, vshrink, kernel);
    memoize(operation_key("reduce", input, &args), false, || {
        let width = target_dimension(input.width(), 1.0 / hshrink);
        let height = target_dimension(input.height(), 1.0 / vshrink);
        resample("reduce", input, width, height, kernel)
    })
}

/// Scale by arbitrary factors, up or down.
pub(crate) fn resize(
    input: &RawImage,
    scale: f64,
    vscale: f64,
    kernel: Kernel,
) -> Status<Arc<RawImage>> {
    ensure_running("resize")?;
    if !(scale > 0.0 && vscale > 0.0) || !scale.is_finite() || !vscale.is_finite() {
        return Err(record("resize", "scale must be positive"));
    }
    let args = (scale, vscale, kernel);
    memoize(operation_key("resize", input, &args), false, || {
        let width = target_dimension(input.width(), scale);
        let height = target_dimension(input.height(), vscale);
        resample("resize", input, width, height, kernel)
    })
}

pub(crate) fn affine(input: &RawImage, args: &AffineArgs) -> Status<Arc<RawImage>> {
    ensure_running("affine")?;
    let area = match &args.output_area {
        Some(values) => match values.as_slice() {
            &[left, top, width, height] if width > 0 && height > 0 => {
                Some(Rect::new(left, top, width, height))
            }
            _ => return Err(record("affine", "output area must be [left, top, width, height]")),
        },
        None => None,
    };
    memoize(operation_key("affine", input, args), false, || {
        let transform = Transform {
            matrix: args.matrix,
            idx: args.idx,
            idy: args.idy,
            odx: args.odx,
            ody: args.ody,
        };
        affine_raw("affine", input, &transform, area, args.interpolate.kind())
    })
}

pub(crate) fn similarity(input: &RawImage, args: &SimilarityArgs) -> Status<Arc<RawImage>> {
    ensure_running("similarity")?;
    if !(args.scale > 0.0) {
        return Err(record("similarity", "scale must be positive"));
    }
    memoize(operation_key("similarity", input, args), false, || {
        let (sin, cos) = args.angle.to_radians().sin_cos();
        let transform = Transform {
            matrix: [
                args.scale * cos,
                -args.scale * sin,
                args.scale * sin,
                args.scale * cos,
            ],
            idx: args.idx,
            idy: args.idy,
            odx: args.odx,
            ody: args.ody,
        };
        affine_raw("similarity", input, &transform, None, args.interpolate.kind())
    })
}

/// `round(dim * scale)`, never below one pixel.
fn target_dimension(dim: u32, scale: f64) -> u32 {
    ((dim as f64 * scale).round() as u32).max(1)
}

/// Replicate or truncate background values to `bands` entries.
pub(crate) fn expand_background(values: &[f64], bands: usize) -> Option<Vec<f64>> {
    match values.len() {
        0 => Some(vec![0.0; bands]),
        1 => Some(vec![values[0]; bands]),
        n if n >= bands => Some(values[..bands].to_vec()),
        _ => None,
    }
}

fn embed_raw(input: &RawImage, args: &EmbedArgs) -> Status<RawImage> {
    if args.width <= 0 || args.height <= 0 {
        return Err(record("embed", "output size must be positive"));
    }
    let bands = input.bands() as usize;
    let fill = match args.extend {
        Extend::White => vec![255.0; bands],
        Extend::Background => {
            let values = args.background.as_ref().map_or(&[][..], |bg| bg.as_slice());
            expand_background(values, bands)
                .ok_or_else(|| record("embed", format!("background needs {bands} values")))?
        }
        _ => vec![0.0; bands],
    };
    let pixels = match input.pixels() {
        Pixels::UChar(data) => Pixels::UChar(Arc::new(embed_samples(data, input, args, &fill))),
        Pixels::Float(data) => Pixels::Float(Arc::new(embed_samples(data, input, args, &fill))),
    };
    Ok(RawImage::from_pixels(
        args.width as u32,
        args.height as u32,
        input.bands(),
        input.interpretation(),
        pixels,
    )
    .with_icc(input.icc().cloned()))
}

fn embed_samples<T: Sample>(data: &[T], input: &RawImage, args: &EmbedArgs, fill: &[f64]) -> Vec<T> {
    let bands = input.bands() as usize;
    let (width, height) = (input.width() as i64, input.height() as i64);
    let fill: Vec<T> = fill.iter().map(|&v| T::from_f64(v)).collect();
    let out_width = args.width as usize;
    let mut out = vec![T::default(); out_width * args.height as usize * bands];
    run(|| {
        out.par_chunks_mut(out_width * bands)
            .enumerate()
            .for_each(|(oy, row)| {
                let sy = extend_coord(oy as i64 - args.y as i64, height, args.extend);
                for (ox, dst) in row.chunks_exact_mut(bands).enumerate() {
                    let sx = extend_coord(ox as i64 - args.x as i64, width, args.extend);
                    match (sx, sy) {
                        (Some(sx), Some(sy)) => {
                            let offset = (sy * width + sx) as usize * bands;
                            dst.copy_from_slice(&data[offset..offset + bands]);
                        }
                        _ => dst.copy_from_slice(&fill),
                    }
                }
            });
    });
    out
}

fn extend_coord(coord: i64, len: i64, extend: Extend) -> Option<i64> {
    if (0..len).contains(&coord) {
        return Some(coord);
    }
    match extend {
        Extend::Copy => Some(coord.clamp(0, len - 1)),
        Extend::Repeat => Some(coord.rem_euclid(len)),
        Extend::Mirror => {
            let period = 2 * len;
            let m = coord.rem_euclid(period);
            Some(if m < len { m } else { period - 1 - m })
        }
        Extend::Black | Extend::White | Extend::Background => None,
    }
}

fn extract_samples<T: Sample>(data: &[T], input: &RawImage, area: Rect) -> Vec<T> {
    let row_len = input.row_len();
    let bands = input.bands() as usize;
    let start = area.left as usize * bands;
    let len = area.width as usize * bands;
    let mut out = Vec::with_capacity(len * area.height as usize);
    for y in area.top as usize..area.bottom() as usize {
        let offset = y * row_len + start;
        out.extend_from_slice(&data[offset..offset + len]);
    }
    out
}

/// Integer block average. Output is `dim / factor`, at least one pixel.
pub(crate) fn box_shrink(input: &RawImage, xs: u32, ys: u32) -> Status<RawImage> {
    if xs == 0 || ys == 0 {
        return Err(record("shrink", "shrink factors must be >= 1"));
    }
    let width = (input.width() / xs).max(1);
    let height = (input.height() / ys).max(1);
    let pixels = match input.pixels() {
        Pixels::UChar(data) => {
            Pixels::UChar(Arc::new(box_samples(data, input, xs, ys, width, height)))
        }
        Pixels::Float(data) => {
            Pixels::Float(Arc::new(box_samples(data, input, xs, ys, width, height)))
        }
    };
    Ok(RawImage::from_pixels(
        width,
        height,
        input.bands(),
        input.interpretation(),
        pixels,
    ))
}

fn box_samples<T: Sample>(
    data: &[T],
    input: &RawImage,
    xs: u32,
    ys: u32,
    width: u32,
    height: u32,
) -> Vec<T> {
    let bands = input.bands() as usize;
    let (in_w, in_h) = (input.width() as usize, input.height() as usize);
    let (xs, ys) = (xs as usize, ys as usize);
    let mut out = vec![T::default(); width as usize * height as usize * bands];
    run(|| {
        out.par_chunks_mut(width as usize * bands)
            .enumerate()
            .for_each(|(oy, row)| {
                let y0 = oy * ys;
                let y1 = (y0 + ys).min(in_h);
                let mut sums = vec![0f64; bands];
                for (ox, dst) in row.chunks_exact_mut(bands).enumerate() {
                    let x0 = ox * xs;
                    let x1 = (x0 + xs).min(in_w);
                    sums.iter_mut().for_each(|s| *s = 0.0);
                    for y in y0..y1 {
                        for x in x0..x1 {
                            let offset = (y * in_w + x) * bands;
                            for (sum, sample) in sums.iter_mut().zip(&data[offset..offset + bands]) {
                                *sum += sample.to_f32() as f64;
                            }
                        }
                    }
                    let count = ((y1 - y0) * (x1 - x0)).max(1) as f64;
                    for (d, sum) in dst.iter_mut().zip(&sums) {
                        *d = T::from_f64(sum / count);
                    }
                }
            });
    });
    out
}

fn resize_alg(kernel: Kernel) -> ResizeAlg {
    match kernel {
        Kernel::Nearest => ResizeAlg::Nearest,
        Kernel::Linear => ResizeAlg::Convolution(FilterType::Bilinear),
        Kernel::Cubic => ResizeAlg::Convolution(FilterType::CatmullRom),
        // No two-lobe Lanczos in fast_image_resize.
        Kernel::Lanczos2 | Kernel::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
    }
}

/// Resample 8-bit samples to exactly `width` x `height`.
fn resample(domain: &str, input: &RawImage, width: u32, height: u32, kernel: Kernel) -> Status<RawImage> {
    let data = input
        .uchar()
        .ok_or_else(|| record(domain, "only 8-bit images can be resampled"))?;
    let pixel_type = match input.bands() {
        1 => PixelType::U8,
        2 => PixelType::U8x2,
        3 => PixelType::U8x3,
        4 => PixelType::U8x4,
        n => return Err(record(domain, format!("{n} bands not supported"))),
    };
    let premultiply = input.has_alpha();
    let resized = run(|| -> Result<Vec<u8>, String> {
        let mut src = FirImage::from_vec_u8(input.width(), input.height(), data.to_vec(), pixel_type)
            .map_err(|e| format!("source image: {e:?}"))?;
        let mut dst = FirImage::new(width, height, pixel_type);
        let mul_div = MulDiv::default();
        if premultiply {
            mul_div
                .multiply_alpha_inplace(&mut src)
                .map_err(|e| format!("premultiply alpha: {e:?}"))?;
        }
        Resizer::new()
            .resize(&src, &mut dst, &ResizeOptions::new().resize_alg(resize_alg(kernel)))
            .map_err(|e| format!("{e:?}"))?;
        if premultiply {
            mul_div
                .divide_alpha_inplace(&mut dst)
                .map_err(|e| format!("unpremultiply alpha: {e:?}"))?;
        }
        Ok(dst.into_vec())
    })
    .map_err(|e| record(domain, e))?;
    Ok(RawImage::new_uchar(width, height, input.bands(), input.interpretation(), resized)
        .with_icc(input.icc().cloned()))
}

/// Forward map: `X = a(x + idx) + b(y + idy) + odx`, `Y = c(x + idx) + d(y + idy) + ody`.
struct Transform {
    matrix: [f64; 4],
    idx: f64,
    idy: f64,
    odx: f64,
    ody: f64,
}

impl Transform {
    fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d] = self.matrix;
        let (x, y) = (x + self.idx, y + self.idy);
        (a * x + b * y + self.odx, c * x + d * y + self.ody)
    }

    fn inverse(&self, det: f64, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d] = self.matrix;
        let (x, y) = (x - self.odx, y - self.ody);
        (
            (d * x - b * y) / det - self.idx,
            (-c * x + a * y) / det - self.idy,
        )
    }

    /// Rounded bounding box of the transformed input rectangle.
    fn bounding_box(&self, width: u32, height: u32) -> Rect {
        let (w, h) = (width as f64, height as f64);
        let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(x, y)| self.forward(x, y));
        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        Rect::new(
            min_x.round() as i32,
            min_y.round() as i32,
            ((max_x - min_x).round() as i32).max(1),
            ((max_y - min_y).round() as i32).max(1),
        )
    }
}

fn affine_raw(
    domain: &str,
    input: &RawImage,
    transform: &Transform,
    area: Option<Rect>,
    interpolate: InterpolateKind,
) -> Status<RawImage> {
    let data = input
        .uchar()
        .ok_or_else(|| record(domain, "only 8-bit images can be transformed"))?;
    let [a, b, c, d] = transform.matrix;
    let det = a * d - b * c;
    if det.abs() < 1e-12 || !det.is_finite() {
        return Err(record(domain, "singular matrix"));
    }
    let area = area.unwrap_or_else(|| transform.bounding_box(input.width(), input.height()));
    let bands = input.bands() as usize;
    let source = Sampler {
        data,
        width: input.width() as i64,
        height: input.height() as i64,
        bands,
    };
    let out_width = area.width as usize;
    let mut out = vec![0u8; out_width * area.height as usize * bands];
    run(|| {
        out.par_chunks_mut(out_width * bands)
            .enumerate()
            .for_each(|(j, row)| {
                let mut value = vec![0f32; bands];
                let oy = area.top as f64 + j as f64 + 0.5;
                for (i, dst) in row.chunks_exact_mut(bands).enumerate() {
                    let ox = area.left as f64 + i as f64 + 0.5;
                    let (sx, sy) = transform.inverse(det, ox, oy);
                    if source.sample(sx - 0.5, sy - 0.5, interpolate, &mut value) {
                        for (d, v) in dst.iter_mut().zip(&value) {
                            *d = u8::from_f64(*v as f64);
                        }
                    }
                }
            });
    });
    Ok(RawImage::new_uchar(
        area.width as u32,
        area.height as u32,
        input.bands(),
        input.interpretation(),
        out,
    )
    .with_icc(input.icc().cloned()))
}

struct Sampler<'a> {
    data: &'a [u8],
    width: i64,
    height: i64,
    bands: usize,
}

impl Sampler<'_> {
    fn texel(&self, x: i64, y: i64, band: usize) -> f32 {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        self.data[(y * self.width + x) as usize * self.bands + band] as f32
    }

    /// Sample at pixel-index coordinates. Returns false outside the image.
    fn sample(&self, x: f64, y: f64, kind: InterpolateKind, out: &mut [f32]) -> bool {
        if x < -0.5 || y < -0.5 || x >= self.width as f64 - 0.5 || y >= self.height as f64 - 0.5 {
            return false;
        }
        match kind {
            InterpolateKind::Nearest => {
                let (xi, yi) = (x.round() as i64, y.round() as i64);
                for (band, v) in out.iter_mut().enumerate() {
                    *v = self.texel(xi, yi, band);
                }
            }
            InterpolateKind::Bilinear => {
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = ((x - x0) as f32, (y - y0) as f32);
                let (x0, y0) = (x0 as i64, y0 as i64);
                for (band, v) in out.iter_mut().enumerate() {
                    let top = self.texel(x0, y0, band) * (1.0 - fx) + self.texel(x0 + 1, y0, band) * fx;
                    let bottom =
                        self.texel(x0, y0 + 1, band) * (1.0 - fx) + self.texel(x0 + 1, y0 + 1, band) * fx;
                    *v = top * (1.0 - fy) + bottom * fy;
                }
            }
            InterpolateKind::Bicubic => {
                let (x0, y0) = (x.floor(), y.floor());
                let wx = catmull_rom_weights((x - x0) as f32);
                let wy = catmull_rom_weights((y - y0) as f32);
                let (x0, y0) = (x0 as i64, y0 as i64);
                for (band, v) in out.iter_mut().enumerate() {
                    let mut acc = 0.0;
                    for (m, wy) in wy.iter().enumerate() {
                        for (n, wx) in wx.iter().enumerate() {
                            acc += wx * wy * self.texel(x0 + n as i64 - 1, y0 + m as i64 - 1, band);
                        }
                    }
                    *v = acc;
                }
            }
        }
        true
    }
}

fn catmull_rom_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Interpretation;
    use crate::engine::{error_buffer, initialize, thread_cleanup};

    fn rgb(width: u32, height: u32) -> RawImage {
        let data = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, (i / 7 % 256) as u8, 128])
            .collect();
        RawImage::new_uchar(width, height, 3, Interpretation::Srgb, data)
    }

    fn bilinear() -> Interpolate {
        Interpolate::new("bilinear").unwrap()
    }

    fn similarity_args(scale: f64, angle: f64) -> SimilarityArgs {
        SimilarityArgs {
            scale,
            angle,
            interpolate: bilinear(),
            idx: 0.0,
            idy: 0.0,
            odx: 0.0,
            ody: 0.0,
        }
    }

    // =========================================================================
    // extract / embed
    // =========================================================================

    #[test]
    fn extract_area_copies_window() {
        initialize().unwrap();
        let image = rgb(500, 400);
        let out = extract_area(&image, Rect::new(100, 100, 400, 300)).unwrap();
        assert_eq!((out.width(), out.height()), (400, 300));
        let src = image.uchar().unwrap();
        let first = (100 * 500 + 100) * 3;
        assert_eq!(&out.uchar().unwrap()[..3], &src[first..first + 3]);
    }

    #[test]
    fn extract_area_outside_image_fails() {
        initialize().unwrap();
        thread_cleanup();
        let image = rgb(50, 40);
        assert!(extract_area(&image, Rect::new(10, 10, 50, 10)).is_err());
        assert!(extract_area(&image, Rect::new(-1, 0, 5, 5)).is_err());
        assert!(error_buffer().unwrap().contains("bad extract area"));
    }

    #[test]
    fn embed_grows_canvas_with_background() {
        initialize().unwrap();
        let image = RawImage::new_uchar(1, 1, 3, Interpretation::Srgb, vec![9, 9, 9]);
        let args = EmbedArgs {
            x: 1,
            y: 1,
            width: 3,
            height: 3,
            extend: Extend::Background,
            background: Some(ArrayDouble::new(&[255.0, 0.0, 0.0])),
        };
        let out = embed(&image, &args).unwrap();
        let data = out.uchar().unwrap();
        assert_eq!((out.width(), out.height()), (3, 3));
        assert_eq!(&data[..3], &[255, 0, 0]);
        assert_eq!(&data[12..15], &[9, 9, 9]);
    }

    #[test]
    fn embed_large_canvas() {
        initialize().unwrap();
        let image = rgb(64, 48);
        let args = EmbedArgs {
            x: 100,
            y: 100,
            width: 5000,
            height: 5000,
            extend: Extend::Black,
            background: None,
        };
        let out = embed(&image, &args).unwrap();
        assert_eq!((out.width(), out.height()), (5000, 5000));
    }

    #[test]
    fn extend_modes_map_coordinates() {
        assert_eq!(extend_coord(-1, 4, Extend::Copy), Some(0));
        assert_eq!(extend_coord(5, 4, Extend::Repeat), Some(1));
        assert_eq!(extend_coord(-1, 4, Extend::Mirror), Some(0));
        assert_eq!(extend_coord(4, 4, Extend::Mirror), Some(3));
        assert_eq!(extend_coord(4, 4, Extend::Black), None);
    }

    #[test]
    fn background_expansion() {
        assert_eq!(expand_background(&[], 3), Some(vec![0.0; 3]));
        assert_eq!(expand_background(&[7.0], 2), Some(vec![7.0, 7.0]));
        assert_eq!(expand_background(&[1.0, 2.0], 3), None);
    }

    // =========================================================================
    // shrink / reduce / resize
    // =========================================================================

    #[test]
    fn shrink_by_two_halves_both_axes() {
        initialize().unwrap();
        let image = rgb(100, 60);
        let out = shrink(&image, 2.0, 2.0).unwrap();
        assert_eq!((out.width(), out.height()), (50, 30));
    }

    #[test]
    fn shrink_one_axis() {
        initialize().unwrap();
        let image = rgb(100, 60);
        let h = shrink(&image, 2.0, 1.0).unwrap();
        let v = shrink(&image, 1.0, 2.0).unwrap();
        assert_eq!((h.width(), h.height()), (50, 60));
        assert_eq!((v.width(), v.height()), (100, 30));
    }

    #[test]
    fn box_shrink_averages_blocks() {
        let image = RawImage::new_uchar(2, 2, 1, Interpretation::BW, vec![0, 100, 100, 200]);
        let out = box_shrink(&image, 2, 2).unwrap();
        assert_eq!(out.uchar().unwrap(), &[100]);
    }

    #[test]
    fn fractional_shrink_lands_on_rounded_size() {
        initialize().unwrap();
        let image = rgb(100, 60);
        let out = shrink(&image, 2.5, 2.5).unwrap();
        assert_eq!((out.width(), out.height()), (40, 24));
    }

    #[test]
    fn shrink_below_one_fails() {
        initialize().unwrap();
        thread_cleanup();
        assert!(shrink(&rgb(4, 4), 0.5, 1.0).is_err());
        assert!(error_buffer().is_some());
    }

    #[test]
    fn reduce_by_two() {
        initialize().unwrap();
        let image = rgb(100, 60);
        let out = reduce(&image, 2.0, 2.0, Kernel::Lanczos3).unwrap();
        assert_eq!((out.width(), out.height()), (50, 30));
        let h = reduce(&image, 2.0, 1.0, Kernel::Linear).unwrap();
        assert_eq!((h.width(), h.height()), (50, 60));
    }

    #[test]
    fn resize_can_upscale() {
        initialize().unwrap();
        let out = resize(&rgb(10, 8), 2.0, 2.0, Kernel::Cubic).unwrap();
        assert_eq!((out.width(), out.height()), (20, 16));
    }

    #[test]
    fn resize_keeps_alpha_of_opaque_pixels() {
        initialize().unwrap();
        let image = RawImage::new_uchar(8, 8, 4, Interpretation::Srgb, [10, 20, 30, 255].repeat(64));
        let out = resize(&image, 0.5, 0.5, Kernel::Lanczos3).unwrap();
        let pixel = &out.uchar().unwrap()[..4];
        for (got, want) in pixel.iter().zip([10u8, 20, 30, 255]) {
            assert!(got.abs_diff(want) <= 1, "{pixel:?}");
        }
    }

    // =========================================================================
    // affine / similarity
    // =========================================================================

    #[test]
    fn similarity_scales_bounds() {
        initialize().unwrap();
        let image = rgb(400, 200);
        for (scale, expected) in [(0.25, (100, 50)), (0.5, (200, 100)), (1.0, (400, 200)), (2.0, (800, 400))] {
            let out = similarity(&image, &similarity_args(scale, 0.0)).unwrap();
            assert_eq!((out.width(), out.height()), expected, "scale {scale}");
        }
    }

    #[test]
    fn similarity_quarter_turns_swap_dimensions() {
        initialize().unwrap();
        let image = rgb(40, 20);
        for angle in [90.0, 270.0] {
            let out = similarity(&image, &similarity_args(1.0, angle)).unwrap();
            assert_eq!((out.width(), out.height()), (20, 40), "angle {angle}");
        }
    }

    #[test]
    fn affine_identity_preserves_pixels() {
        initialize().unwrap();
        let image = rgb(16, 9);
        let args = AffineArgs {
            matrix: [1.0, 0.0, 0.0, 1.0],
            interpolate: Interpolate::new("nearest").unwrap(),
            output_area: None,
            idx: 0.0,
            idy: 0.0,
            odx: 0.0,
            ody: 0.0,
        };
        let out = affine(&image, &args).unwrap();
        assert_eq!(out.uchar().unwrap(), image.uchar().unwrap());
    }

    #[test]
    fn affine_output_area_sets_size() {
        initialize().unwrap();
        let args = AffineArgs {
            matrix: [2.0, 0.0, 0.0, 2.0],
            interpolate: bilinear(),
            output_area: Some(ArrayInt::new(&[0, 0, 10, 5])),
            idx: 0.0,
            idy: 0.0,
            odx: 0.0,
            ody: 0.0,
        };
        let out = affine(&rgb(16, 9), &args).unwrap();
        assert_eq!((out.width(), out.height()), (10, 5));
    }

    #[test]
    fn affine_singular_matrix_fails() {
        initialize().unwrap();
        thread_cleanup();
        let args = AffineArgs {
            matrix: [1.0, 1.0, 1.0, 1.0],
            interpolate: bilinear(),
            output_area: None,
            idx: 0.0,
            idy: 0.0,
            odx: 0.0,
            ody: 0.0,
        };
        assert!(affine(&rgb(4, 4), &args).is_err());
        assert!(error_buffer().unwrap().contains("singular"));
    }
}
