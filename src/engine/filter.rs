//! Convolution primitives: Gaussian blur and unsharp-mask sharpen.
//!
//! Both run as two separable 1-D passes over `f32` planes with edge pixels
//! clamped, one output row per rayon task.

use super::cache::{memoize, operation_key};
use super::colour::{lab_to_linear, linear_to_lab, linear_to_srgb, srgb_to_linear};
use super::raw::{Pixels, RawImage};
use super::types::{Interpretation, Precision};
use super::{Status, ensure_running, record, run};
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurArgs {
    pub sigma: f64,
    pub precision: Precision,
    /// Kernel is truncated where the Gaussian falls below this.
    pub min_ampl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpenArgs {
    pub sigma: f64,
    /// Flat/jaggy threshold on the L* difference.
    pub x1: f64,
    /// Maximum brightening.
    pub y2: f64,
    /// Maximum darkening.
    pub y3: f64,
    /// Gain in flat areas.
    pub m1: f64,
    /// Gain in jaggy areas.
    pub m2: f64,
}

pub(crate) fn gaussblur(input: &RawImage, args: &BlurArgs) -> Status<Arc<RawImage>> {
    ensure_running("gaussblur")?;
    let passes = blur_passes("gaussblur", args)?;
    memoize(operation_key("gaussblur", input, args), false, || {
        let (width, height, bands) = (
            input.width() as usize,
            input.height() as usize,
            input.bands() as usize,
        );
        let plane: Vec<f32> = match input.pixels() {
            Pixels::UChar(data) => data.iter().map(|&v| v as f32).collect(),
            Pixels::Float(data) => data.to_vec(),
        };
        let blurred = run(|| {
            passes.iter().fold(plane, |acc, kernel| {
                let horizontal = convolve_rows(&acc, width, height, bands, kernel);
                convolve_columns(&horizontal, width, height, bands, kernel)
            })
        });
        let out = match input.pixels() {
            Pixels::UChar(_) => RawImage::new_uchar(
                input.width(),
                input.height(),
                input.bands(),
                input.interpretation(),
                blurred.iter().map(|v| v.round().clamp(0.0, 255.0) as u8).collect(),
            ),
            Pixels::Float(_) => RawImage::new_float(
                input.width(),
                input.height(),
                input.bands(),
                input.interpretation(),
                blurred,
            ),
        };
        Ok(out.with_icc(input.icc().cloned()))
    })
}

pub(crate) fn sharpen(input: &RawImage, args: &SharpenArgs) -> Status<Arc<RawImage>> {
    ensure_running("sharpen")?;
    let data = input
        .uchar()
        .ok_or_else(|| record("sharpen", "only 8-bit images can be sharpened"))?;
    let colour_bands = match (input.interpretation(), input.bands()) {
        (Interpretation::Srgb | Interpretation::Rgb, 3 | 4) => 3,
        (Interpretation::BW, 1 | 2) => 1,
        (interpretation, bands) => {
            return Err(record(
                "sharpen",
                format!("cannot sharpen {bands}-band {} image", interpretation.name()),
            ));
        }
    };
    let blur = BlurArgs {
        sigma: args.sigma,
        precision: Precision::Float,
        min_ampl: 0.2,
    };
    let passes = blur_passes("sharpen", &blur)?;
    memoize(operation_key("sharpen", input, args), false, || {
        let (width, height) = (input.width() as usize, input.height() as usize);
        let bands = input.bands() as usize;
        let lab: Vec<[f32; 3]> = data
            .chunks_exact(bands)
            .map(|px| linear_to_lab(decode_linear(px, colour_bands)))
            .collect();
        let lightness: Vec<f32> = lab.iter().map(|p| p[0]).collect();
        let smooth = run(|| {
            passes.iter().fold(lightness, |acc, kernel| {
                let horizontal = convolve_rows(&acc, width, height, 1, kernel);
                convolve_columns(&horizontal, width, height, 1, kernel)
            })
        });
        let mut out = data.to_vec();
        for ((px, lab), blurred) in out.chunks_exact_mut(bands).zip(&lab).zip(&smooth) {
            let difference = (lab[0] - blurred) as f64;
            let lightness = lab[0] + sharpen_curve(difference, args) as f32;
            let linear = lab_to_linear([lightness.clamp(0.0, 100.0), lab[1], lab[2]]);
            encode_srgb(linear, &mut px[..colour_bands]);
        }
        Ok(RawImage::new_uchar(
            input.width(),
            input.height(),
            input.bands(),
            input.interpretation(),
            out,
        )
        .with_icc(input.icc().cloned()))
    })
}

/// Gain applied to a lightness difference: `m1` below `x1`, `m2` beyond,
/// clipped to `[-y3, y2]`.
fn sharpen_curve(difference: f64, args: &SharpenArgs) -> f64 {
    let magnitude = difference.abs();
    let gained = if magnitude <= args.x1 {
        magnitude * args.m1
    } else {
        args.x1 * args.m1 + (magnitude - args.x1) * args.m2
    };
    let signed = gained.copysign(difference);
    signed.clamp(-args.y3, args.y2)
}

fn decode_linear(px: &[u8], colour_bands: usize) -> [f32; 3] {
    if colour_bands == 1 {
        let v = srgb_to_linear(px[0] as f32 / 255.0);
        [v, v, v]
    } else {
        [0, 1, 2].map(|i| srgb_to_linear(px[i] as f32 / 255.0))
    }
}

fn encode_srgb(linear: [f32; 3], out: &mut [u8]) {
    let to_u8 = |v: f32| (linear_to_srgb(v) * 255.0).round().clamp(0.0, 255.0) as u8;
    if out.len() == 1 {
        let y = 0.2126 * linear[0] + 0.7152 * linear[1] + 0.0722 * linear[2];
        out[0] = to_u8(y);
    } else {
        for (o, v) in out.iter_mut().zip(linear) {
            *o = to_u8(v);
        }
    }
}

/// 1-D kernels, each applied horizontally then vertically.
fn blur_passes(domain: &str, args: &BlurArgs) -> Status<Vec<Vec<f32>>> {
    if !(args.sigma > 0.0) || !args.sigma.is_finite() {
        return Err(record(domain, "sigma must be positive"));
    }
    if !(args.min_ampl > 0.0 && args.min_ampl < 1.0) {
        return Err(record(domain, "min_ampl must be between 0 and 1"));
    }
    Ok(match args.precision {
        Precision::Approximate => {
            let ideal = (12.0 * args.sigma * args.sigma / 3.0 + 1.0).sqrt();
            let radius = ((ideal - 1.0) / 2.0).round().max(1.0) as usize;
            let size = 2 * radius + 1;
            vec![vec![1.0 / size as f32; size]; 3]
        }
        Precision::Float => vec![gaussian_kernel(args.sigma, args.min_ampl)],
        Precision::Integer => {
            let kernel = gaussian_kernel(args.sigma, args.min_ampl);
            let quantized: Vec<f32> = kernel.iter().map(|w| (w * 256.0).round()).collect();
            let sum: f32 = quantized.iter().sum();
            vec![quantized.iter().map(|w| w / sum).collect()]
        }
    })
}

/// Normalized Gaussian, truncated where it drops below `min_ampl`.
fn gaussian_kernel(sigma: f64, min_ampl: f64) -> Vec<f32> {
    let radius = (sigma * (-2.0 * min_ampl.ln()).sqrt()).ceil().max(1.0) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-(x * x) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

fn convolve_rows(src: &[f32], width: usize, height: usize, bands: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;
    let row_len = width * bands;
    let mut dst = vec![0f32; row_len * height];
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(out, row)| {
            for x in 0..width as i64 {
                for band in 0..bands {
                    let mut acc = 0.0;
                    for (k, weight) in kernel.iter().enumerate() {
                        let sx = (x + k as i64 - radius).clamp(0, width as i64 - 1) as usize;
                        acc += weight * row[sx * bands + band];
                    }
                    out[x as usize * bands + band] = acc;
                }
            }
        });
    dst
}

fn convolve_columns(src: &[f32], width: usize, height: usize, bands: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;
    let row_len = width * bands;
    let mut dst = vec![0f32; row_len * height];
    dst.par_chunks_mut(row_len).enumerate().for_each(|(y, out)| {
        for (k, weight) in kernel.iter().enumerate() {
            let sy = (y as i64 + k as i64 - radius).clamp(0, height as i64 - 1) as usize;
            let row = &src[sy * row_len..(sy + 1) * row_len];
            for (o, v) in out.iter_mut().zip(row) {
                *o += weight * v;
            }
        }
    });
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{error_buffer, initialize, thread_cleanup};

    fn blur_args(sigma: f64, precision: Precision) -> BlurArgs {
        BlurArgs {
            sigma,
            precision,
            min_ampl: 0.2,
        }
    }

    fn sharpen_args() -> SharpenArgs {
        SharpenArgs {
            sigma: 0.5,
            x1: 2.0,
            y2: 10.0,
            y3: 20.0,
            m1: 0.0,
            m2: 3.0,
        }
    }

    fn edge() -> RawImage {
        let data = (0..16 * 16)
            .flat_map(|i| if i % 16 < 8 { [40u8; 3] } else { [200u8; 3] })
            .collect();
        RawImage::new_uchar(16, 16, 3, Interpretation::Srgb, data)
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2.0, 0.2);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len() % 2, 1);
        assert_eq!(kernel.first(), kernel.last());
    }

    #[test]
    fn smaller_min_ampl_widens_kernel() {
        assert!(gaussian_kernel(2.0, 0.01).len() > gaussian_kernel(2.0, 0.2).len());
    }

    #[test]
    fn blur_preserves_flat_image() {
        initialize().unwrap();
        let flat = RawImage::new_uchar(9, 7, 3, Interpretation::Srgb, vec![77; 9 * 7 * 3]);
        for precision in [Precision::Integer, Precision::Float, Precision::Approximate] {
            let out = gaussblur(&flat, &blur_args(1.5, precision)).unwrap();
            assert!(out.uchar().unwrap().iter().all(|&v| v == 77), "{precision:?}");
        }
    }

    #[test]
    fn blur_softens_edge() {
        initialize().unwrap();
        let image = edge();
        let out = gaussblur(&image, &blur_args(2.0, Precision::Float)).unwrap();
        let row = &out.uchar().unwrap()[..16 * 3];
        assert!(row[7 * 3] > 40 && row[7 * 3] < 200);
        assert_eq!((out.width(), out.height()), (16, 16));
    }

    #[test]
    fn blur_rejects_bad_sigma() {
        initialize().unwrap();
        thread_cleanup();
        assert!(gaussblur(&edge(), &blur_args(0.0, Precision::Integer)).is_err());
        assert!(error_buffer().unwrap().contains("sigma"));
    }

    #[test]
    fn sharpen_increases_edge_contrast() {
        initialize().unwrap();
        let image = edge();
        let out = sharpen(&image, &sharpen_args()).unwrap();
        let row = &out.uchar().unwrap()[..16 * 3];
        assert!(row[7 * 3] <= 40, "dark side darkened: {}", row[7 * 3]);
        assert!(row[8 * 3] >= 200, "light side brightened: {}", row[8 * 3]);
    }

    #[test]
    fn sharpen_rejects_cmyk() {
        initialize().unwrap();
        thread_cleanup();
        let cmyk = RawImage::new_uchar(2, 2, 4, Interpretation::Cmyk, vec![0; 16]);
        assert!(sharpen(&cmyk, &sharpen_args()).is_err());
        assert!(error_buffer().unwrap().contains("cmyk"));
    }

    #[test]
    fn curve_is_flat_below_threshold_and_clipped() {
        let args = sharpen_args();
        assert_eq!(sharpen_curve(1.0, &args), 0.0);
        assert_eq!(sharpen_curve(4.0, &args), 6.0);
        assert_eq!(sharpen_curve(100.0, &args), 10.0);
        assert_eq!(sharpen_curve(-100.0, &args), -20.0);
    }
}
