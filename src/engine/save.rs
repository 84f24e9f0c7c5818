//! Savers: engine image in, encoded bytes out.
//!
//! JPEG and PNG go through the `image` encoders, WebP through libwebp. Tuning
//! flags an encoder has no knob for are accepted and logged at `debug`.

use super::args::NativeString;
use super::colour::load_profile;
use super::raw::RawImage;
use super::types::{Interpretation, PngFilter, QuantTable, WebpPreset};
use super::{Status, ensure_running, record};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use std::borrow::Cow;

#[derive(Debug)]
pub struct JpegSaveArgs {
    pub quality: i32,
    /// `None` keeps the image's own profile; an empty name embeds none.
    pub profile: Option<NativeString>,
    pub optimize_coding: bool,
    pub interlace: bool,
    pub strip: bool,
    pub no_subsample: bool,
    pub trellis_quant: bool,
    pub overshoot_deringing: bool,
    pub optimize_scans: bool,
    pub quant_table: QuantTable,
}

#[derive(Debug)]
pub struct PngSaveArgs {
    /// zlib level, 0-9.
    pub compression: i32,
    pub interlace: bool,
    pub profile: Option<NativeString>,
    pub filter: PngFilter,
}

#[derive(Debug)]
pub struct WebpSaveArgs {
    pub quality: i32,
    pub lossless: bool,
    pub preset: WebpPreset,
    pub smart_subsample: bool,
    pub near_lossless: bool,
    pub alpha_quality: i32,
}

pub(crate) fn jpegsave_buffer(input: &RawImage, args: &JpegSaveArgs) -> Status<Vec<u8>> {
    const DOMAIN: &str = "jpegsave";
    ensure_running(DOMAIN)?;
    if args.optimize_coding
        || args.interlace
        || args.trellis_quant
        || args.overshoot_deringing
        || args.optimize_scans
        || args.quant_table != QuantTable::default()
    {
        tracing::debug!(?args, "jpeg encoder applies quality and profile only");
    }
    let (samples, color) = saveable(DOMAIN, input, false)?;
    let icc = output_profile(DOMAIN, input, args.profile.as_ref(), args.strip)?;
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, args.quality.clamp(1, 100) as u8);
    if let Some(icc) = icc {
        encoder
            .set_icc_profile(icc)
            .map_err(|e| record(DOMAIN, e))?;
    }
    encoder
        .write_image(&samples, input.width(), input.height(), color)
        .map_err(|e| record(DOMAIN, e))?;
    Ok(out)
}

pub(crate) fn pngsave_buffer(input: &RawImage, args: &PngSaveArgs) -> Status<Vec<u8>> {
    const DOMAIN: &str = "pngsave";
    ensure_running(DOMAIN)?;
    let compression = match args.compression {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        7..=9 => CompressionType::Best,
        level => return Err(record(DOMAIN, format!("compression {level} outside 0-9"))),
    };
    if args.interlace {
        tracing::debug!("png encoder writes non-interlaced output");
    }
    let filter = match args.filter {
        PngFilter::None => FilterType::NoFilter,
        PngFilter::Sub => FilterType::Sub,
        PngFilter::Up => FilterType::Up,
        PngFilter::Avg => FilterType::Avg,
        PngFilter::Paeth => FilterType::Paeth,
        PngFilter::All => FilterType::Adaptive,
    };
    let (samples, color) = saveable(DOMAIN, input, true)?;
    let icc = output_profile(DOMAIN, input, args.profile.as_ref(), false)?;
    let mut out = Vec::new();
    let mut encoder = PngEncoder::new_with_quality(&mut out, compression, filter);
    if let Some(icc) = icc {
        encoder
            .set_icc_profile(icc)
            .map_err(|e| record(DOMAIN, e))?;
    }
    encoder
        .write_image(&samples, input.width(), input.height(), color)
        .map_err(|e| record(DOMAIN, e))?;
    Ok(out)
}

pub(crate) fn webpsave_buffer(input: &RawImage, args: &WebpSaveArgs) -> Status<Vec<u8>> {
    const DOMAIN: &str = "webpsave";
    ensure_running(DOMAIN)?;
    if args.preset != WebpPreset::Default || args.smart_subsample || args.alpha_quality != 100 {
        tracing::debug!(?args, "webp encoder applies quality and lossless only");
    }
    let (samples, _) = saveable(DOMAIN, input, true)?;
    let bands = if input.has_alpha() { 4 } else { 3 };
    let rgb: Cow<'_, [u8]> = match input.bands() {
        1 => Cow::Owned(samples.iter().flat_map(|&v| [v, v, v]).collect()),
        2 => Cow::Owned(
            samples
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
        ),
        _ => samples,
    };
    let encoder = if bands == 4 {
        webp::Encoder::from_rgba(&rgb, input.width(), input.height())
    } else {
        webp::Encoder::from_rgb(&rgb, input.width(), input.height())
    };
    let encoded = if args.lossless || args.near_lossless {
        encoder.encode_lossless()
    } else {
        encoder.encode(args.quality.clamp(0, 100) as f32)
    };
    if encoded.is_empty() {
        return Err(record(DOMAIN, "libwebp produced no output"));
    }
    Ok(encoded.to_vec())
}

/// 8-bit samples and their colour type. Alpha is dropped unless `keep_alpha`.
fn saveable<'a>(
    domain: &str,
    input: &'a RawImage,
    keep_alpha: bool,
) -> Status<(Cow<'a, [u8]>, ExtendedColorType)> {
    let data = input
        .uchar()
        .ok_or_else(|| record(domain, "only 8-bit images can be saved, convert first"))?;
    match input.interpretation() {
        Interpretation::Srgb | Interpretation::Rgb | Interpretation::BW | Interpretation::Multiband => {}
        other => {
            return Err(record(
                domain,
                format!("cannot save {} images, convert to srgb first", other.name()),
            ));
        }
    }
    let bands = input.bands() as usize;
    let (samples, bands) = if input.has_alpha() && !keep_alpha {
        let stripped = data
            .chunks_exact(bands)
            .flat_map(|px| px[..bands - 1].iter().copied())
            .collect();
        (Cow::Owned(stripped), bands - 1)
    } else {
        (Cow::Borrowed(data), bands)
    };
    let color = match bands {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        n => return Err(record(domain, format!("cannot save {n}-band image"))),
    };
    Ok((samples, color))
}

fn output_profile(
    domain: &str,
    input: &RawImage,
    profile: Option<&NativeString>,
    strip: bool,
) -> Status<Option<Vec<u8>>> {
    if strip {
        return Ok(None);
    }
    match profile {
        Some(name) if name.as_str().is_empty() => Ok(None),
        Some(name) => load_profile(domain, name.as_str()).map(Some),
        None => Ok(input.icc().map(|icc| icc.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{error_buffer, initialize, thread_cleanup};

    fn jpeg_args(quality: i32) -> JpegSaveArgs {
        JpegSaveArgs {
            quality,
            profile: None,
            optimize_coding: false,
            interlace: false,
            strip: false,
            no_subsample: false,
            trellis_quant: false,
            overshoot_deringing: false,
            optimize_scans: false,
            quant_table: QuantTable::default(),
        }
    }

    fn rgba(width: u32, height: u32) -> RawImage {
        RawImage::new_uchar(
            width,
            height,
            4,
            Interpretation::Srgb,
            [200, 100, 50, 255].repeat((width * height) as usize),
        )
    }

    #[test]
    fn jpeg_drops_alpha() {
        initialize().unwrap();
        let bytes = jpegsave_buffer(&rgba(8, 6), &jpeg_args(80)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn jpeg_quality_zero_is_clamped_to_codec_floor() {
        initialize().unwrap();
        assert!(jpegsave_buffer(&rgba(8, 8), &jpeg_args(0)).is_ok());
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        initialize().unwrap();
        let image = rgba(5, 3);
        let args = PngSaveArgs {
            compression: 6,
            interlace: false,
            profile: None,
            filter: PngFilter::All,
        };
        let bytes = pngsave_buffer(&image, &args).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.into_raw(), image.uchar().unwrap());
    }

    #[test]
    fn png_compression_out_of_range_fails() {
        initialize().unwrap();
        thread_cleanup();
        let args = PngSaveArgs {
            compression: 12,
            interlace: false,
            profile: None,
            filter: PngFilter::None,
        };
        assert!(pngsave_buffer(&rgba(2, 2), &args).is_err());
        assert!(error_buffer().unwrap().contains("compression 12"));
    }

    #[test]
    fn webp_lossy_output_decodes() {
        initialize().unwrap();
        let args = WebpSaveArgs {
            quality: 75,
            lossless: false,
            preset: WebpPreset::Photo,
            smart_subsample: false,
            near_lossless: false,
            alpha_quality: 100,
        };
        let bytes = webpsave_buffer(&rgba(16, 16), &args).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::WebP);
    }

    #[test]
    fn lab_images_must_be_converted_first() {
        initialize().unwrap();
        thread_cleanup();
        let lab = RawImage::new_float(1, 1, 3, Interpretation::Lab, vec![50.0, 0.0, 0.0]);
        assert!(jpegsave_buffer(&lab, &jpeg_args(75)).is_err());
        assert!(error_buffer().is_some());
    }

    #[test]
    fn strip_removes_profile_and_explicit_profile_embeds_one() {
        initialize().unwrap();
        let image = rgba(4, 4);
        let mut args = jpeg_args(90);
        args.profile = Some(NativeString::new("srgb"));
        let with_profile = jpegsave_buffer(&image, &args).unwrap();
        args.strip = true;
        let stripped = jpegsave_buffer(&image, &args).unwrap();
        assert!(with_profile.len() > stripped.len());
    }
}
