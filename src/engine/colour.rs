//! Colour primitives: flatten, colourspace conversion and ICC transforms.
//!
//! Conversions between device spaces go through linear RGB and CIE XYZ
//! (D65, Y scaled to 0..100). LAB, XYZ and scRGB results are stored as
//! `f32`; sRGB, RGB and B_W results are 8-bit. Profile transforms go through
//! Little CMS.

use super::args::{ArrayDouble, NativeString};
use super::cache::{memoize, operation_key};
use super::geometry::expand_background;
use super::raw::{Pixels, RawImage};
use super::types::{BandFormat, Intent, Interpretation};
use super::{Status, ensure_running, record};
use lcms2::{ColorSpaceSignature, PixelFormat, Profile, Transform};
use std::sync::Arc;

#[derive(Debug)]
pub struct FlattenArgs {
    pub background: Option<ArrayDouble>,
    pub max_alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourspaceArgs {
    pub space: Interpretation,
    pub source_space: Interpretation,
}

#[derive(Debug)]
pub struct IccTransformArgs {
    pub output_profile: NativeString,
    /// Used when the image has no embedded profile, or `embedded` is off.
    /// An empty name means the built-in sRGB profile.
    pub input_profile: Option<NativeString>,
    pub intent: Intent,
    pub depth: u32,
    /// Prefer the image's embedded profile over `input_profile`.
    pub embedded: bool,
}

const WHITE: [f32; 3] = [95.047, 100.0, 108.883];

pub(crate) fn flatten(input: &RawImage, args: &FlattenArgs) -> Status<Arc<RawImage>> {
    ensure_running("flatten")?;
    let data = input
        .uchar()
        .ok_or_else(|| record("flatten", "only 8-bit images can be flattened"))?;
    if !(args.max_alpha > 0.0) {
        return Err(record("flatten", "max_alpha must be positive"));
    }
    memoize(operation_key("flatten", input, args), false, || {
        if !input.has_alpha() {
            return Ok(RawImage::from_pixels(
                input.width(),
                input.height(),
                input.bands(),
                input.interpretation(),
                input.pixels().clone(),
            )
            .with_icc(input.icc().cloned()));
        }
        let bands = input.bands() as usize;
        let colour_bands = bands - 1;
        let values = args.background.as_ref().map_or(&[][..], |bg| bg.as_slice());
        let background = expand_background(values, colour_bands)
            .ok_or_else(|| record("flatten", format!("background needs {colour_bands} values")))?;
        let mut out = Vec::with_capacity(data.len() / bands * colour_bands);
        for px in data.chunks_exact(bands) {
            let alpha = (px[colour_bands] as f64).min(args.max_alpha);
            for (sample, bg) in px[..colour_bands].iter().zip(&background) {
                let v = (*sample as f64 * alpha + bg * (args.max_alpha - alpha)) / args.max_alpha;
                out.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }
        Ok(RawImage::new_uchar(
            input.width(),
            input.height(),
            colour_bands as u32,
            input.interpretation(),
            out,
        )
        .with_icc(input.icc().cloned()))
    })
}

/// Whether [`colourspace`] can convert from this image's interpretation.
pub fn colourspace_is_supported(input: &RawImage) -> bool {
    is_supported_space(input.interpretation())
}

fn is_supported_space(space: Interpretation) -> bool {
    matches!(
        space,
        Interpretation::Srgb
            | Interpretation::Rgb
            | Interpretation::BW
            | Interpretation::Lab
            | Interpretation::Xyz
            | Interpretation::ScRgb
    )
}

pub(crate) fn colourspace(input: &RawImage, args: &ColourspaceArgs) -> Status<Arc<RawImage>> {
    ensure_running("colourspace")?;
    for space in [args.source_space, args.space] {
        if !is_supported_space(space) {
            return Err(record(
                "colourspace",
                format!("no known route to or from {}", space.name()),
            ));
        }
    }
    memoize(operation_key("colourspace", input, args), false, || {
        if args.source_space == args.space {
            return Ok(RawImage::from_pixels(
                input.width(),
                input.height(),
                input.bands(),
                args.space,
                input.pixels().clone(),
            )
            .with_icc(input.icc().cloned()));
        }
        let (linear, alpha) = to_linear(input, args.source_space)?;
        Ok(from_linear(input.width(), input.height(), &linear, alpha, args.space))
    })
}

pub(crate) fn icc_transform(input: &RawImage, args: &IccTransformArgs) -> Status<Arc<RawImage>> {
    const DOMAIN: &str = "icc_transform";
    ensure_running(DOMAIN)?;
    if args.depth != 8 {
        return Err(record(DOMAIN, format!("depth {} not supported", args.depth)));
    }
    let data = input
        .uchar()
        .ok_or_else(|| record(DOMAIN, "only 8-bit images can be transformed"))?;
    let (in_format, colour_bands) = match input.bands() {
        1 | 2 => (PixelFormat::GRAY_8, 1),
        3 | 4 if input.interpretation() != Interpretation::Cmyk => (PixelFormat::RGB_8, 3),
        4 => (PixelFormat::CMYK_8, 4),
        n => return Err(record(DOMAIN, format!("{n} bands not supported"))),
    };
    memoize(operation_key(DOMAIN, input, args), false, || {
        let embedded = input.icc().filter(|_| args.embedded || args.input_profile.is_none());
        let input_icc = match (embedded, &args.input_profile) {
            (Some(icc), _) => icc.to_vec(),
            (None, Some(name)) if !name.as_str().is_empty() => load_profile(DOMAIN, name.as_str())?,
            (None, _) => load_profile(DOMAIN, "srgb")?,
        };
        let output_icc = load_profile(DOMAIN, args.output_profile.as_str())?;
        let source = Profile::new_icc(&input_icc).map_err(|e| record(DOMAIN, e))?;
        let target = Profile::new_icc(&output_icc).map_err(|e| record(DOMAIN, e))?;
        let (out_format, out_bands, interpretation) = match target.color_space() {
            ColorSpaceSignature::RgbData => (PixelFormat::RGB_8, 3, Interpretation::Srgb),
            ColorSpaceSignature::CmykData => (PixelFormat::CMYK_8, 4, Interpretation::Cmyk),
            ColorSpaceSignature::GrayData => (PixelFormat::GRAY_8, 1, Interpretation::BW),
            other => return Err(record(DOMAIN, format!("unsupported output space {other:?}"))),
        };
        let transform: Transform<u8, u8> =
            Transform::new(&source, in_format, &target, out_format, lcms_intent(args.intent))
                .map_err(|e| record(DOMAIN, e))?;

        let bands = input.bands() as usize;
        let alpha_band = input.has_alpha() && bands > colour_bands;
        let colour: Vec<u8> = data
            .chunks_exact(bands)
            .flat_map(|px| px[..colour_bands].iter().copied())
            .collect();
        let pixel_count = colour.len() / colour_bands;
        let mut converted = vec![0u8; pixel_count * out_bands];
        transform.transform_pixels(&colour, &mut converted);

        let (out, total_bands) = if alpha_band {
            let mut out = Vec::with_capacity(pixel_count * (out_bands + 1));
            for (px, src) in converted.chunks_exact(out_bands).zip(data.chunks_exact(bands)) {
                out.extend_from_slice(px);
                out.push(src[bands - 1]);
            }
            (out, out_bands + 1)
        } else {
            (converted, out_bands)
        };
        Ok(RawImage::new_uchar(
            input.width(),
            input.height(),
            total_bands as u32,
            interpretation,
            out,
        )
        .with_icc(Some(Arc::new(output_icc))))
    })
}

/// Resolve a profile name: `srgb` is built in, anything else is a path.
pub(crate) fn load_profile(domain: &str, name: &str) -> Status<Vec<u8>> {
    if name.eq_ignore_ascii_case("srgb") {
        return Profile::new_srgb().icc().map_err(|e| record(domain, e));
    }
    std::fs::read(name).map_err(|e| record(domain, format!("profile {name}: {e}")))
}

fn lcms_intent(intent: Intent) -> lcms2::Intent {
    match intent {
        Intent::Perceptual => lcms2::Intent::Perceptual,
        Intent::Relative => lcms2::Intent::RelativeColorimetric,
        Intent::Saturation => lcms2::Intent::Saturation,
        Intent::Absolute => lcms2::Intent::AbsoluteColorimetric,
    }
}

/// Decode any supported space to linear RGB plus an optional alpha band.
fn to_linear(input: &RawImage, space: Interpretation) -> Status<(Vec<[f32; 3]>, Option<Vec<f32>>)> {
    let bands = input.bands() as usize;
    let expected = match space {
        Interpretation::Lab | Interpretation::Xyz | Interpretation::ScRgb => BandFormat::Float,
        _ => BandFormat::UChar,
    };
    if input.format() != expected {
        return Err(record(
            "colourspace",
            format!("{:?} samples do not match {}", input.format(), space.name()),
        ));
    }
    let colour_bands = if space == Interpretation::BW { 1 } else { 3 };
    if bands < colour_bands {
        return Err(record("colourspace", format!("{bands} bands is too few for {}", space.name())));
    }
    let samples: Vec<f32> = match input.pixels() {
        Pixels::UChar(data) => data.iter().map(|&v| v as f32).collect(),
        Pixels::Float(data) => data.to_vec(),
    };
    let alpha: Option<Vec<f32>> = (bands > colour_bands)
        .then(|| samples.chunks_exact(bands).map(|px| px[bands - 1]).collect());
    let linear: Vec<[f32; 3]> = samples
        .chunks_exact(bands)
        .map(|px| match space {
            Interpretation::BW => [srgb_to_linear(px[0] / 255.0); 3],
            Interpretation::Srgb | Interpretation::Rgb => {
                [0, 1, 2].map(|i| srgb_to_linear(px[i] / 255.0))
            }
            Interpretation::ScRgb => [px[0], px[1], px[2]],
            Interpretation::Xyz => xyz_to_linear([px[0], px[1], px[2]]),
            _ => lab_to_linear([px[0], px[1], px[2]]),
        })
        .collect();
    Ok((linear, alpha))
}

fn from_linear(
    width: u32,
    height: u32,
    linear: &[[f32; 3]],
    alpha: Option<Vec<f32>>,
    space: Interpretation,
) -> RawImage {
    let colour_bands = if space == Interpretation::BW { 1 } else { 3 };
    let bands = colour_bands + usize::from(alpha.is_some());
    let alpha_at = |i: usize| alpha.as_ref().map(|a| a[i]);
    match space {
        Interpretation::Srgb | Interpretation::Rgb | Interpretation::BW => {
            let to_u8 = |v: f32| (linear_to_srgb(v) * 255.0).round().clamp(0.0, 255.0) as u8;
            let mut out = Vec::with_capacity(linear.len() * bands);
            for (i, rgb) in linear.iter().enumerate() {
                if colour_bands == 1 {
                    out.push(to_u8(luminance(*rgb)));
                } else {
                    out.extend(rgb.map(to_u8));
                }
                if let Some(a) = alpha_at(i) {
                    out.push(a.round().clamp(0.0, 255.0) as u8);
                }
            }
            RawImage::new_uchar(width, height, bands as u32, space, out)
        }
        _ => {
            let mut out = Vec::with_capacity(linear.len() * bands);
            for (i, rgb) in linear.iter().enumerate() {
                let converted = match space {
                    Interpretation::ScRgb => *rgb,
                    Interpretation::Xyz => linear_to_xyz(*rgb),
                    _ => linear_to_lab(*rgb),
                };
                out.extend(converted);
                if let Some(a) = alpha_at(i) {
                    out.push(a);
                }
            }
            RawImage::new_float(width, height, bands as u32, space, out)
        }
    }
}

pub(crate) fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub(crate) fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn luminance([r, g, b]: [f32; 3]) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

fn linear_to_xyz([r, g, b]: [f32; 3]) -> [f32; 3] {
    [
        (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) * 100.0,
        (0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b) * 100.0,
        (0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b) * 100.0,
    ]
}

fn xyz_to_linear([x, y, z]: [f32; 3]) -> [f32; 3] {
    let (x, y, z) = (x / 100.0, y / 100.0, z / 100.0);
    [
        3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z,
        -0.969_266 * x + 1.876_010_8 * y + 0.041_556 * z,
        0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z,
    ]
}

pub(crate) fn linear_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    const DELTA: f32 = 6.0 / 29.0;
    let f = |t: f32| {
        if t > DELTA * DELTA * DELTA {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    };
    let xyz = linear_to_xyz(rgb);
    let [fx, fy, fz] = [0, 1, 2].map(|i| f(xyz[i] / WHITE[i]));
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

pub(crate) fn lab_to_linear([l, a, b]: [f32; 3]) -> [f32; 3] {
    const DELTA: f32 = 6.0 / 29.0;
    let finv = |t: f32| {
        if t > DELTA {
            t * t * t
        } else {
            3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
        }
    };
    let fy = (l + 16.0) / 116.0;
    let f = [fy + a / 500.0, fy, fy - b / 200.0];
    xyz_to_linear([0, 1, 2].map(|i| finv(f[i]) * WHITE[i]))
}
