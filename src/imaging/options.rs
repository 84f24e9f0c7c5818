//! Per-operation option records and their translation to engine arguments.
//!
//! Every record is plain data with a `Default`. Numeric fields that have an
//! operation-specific default are [`Setting`]s, so "leave it to the default"
//! and "explicitly zero" are different values:
//!
//! | Setting | Resolves to |
//! |---|---|
//! | `Unset` | the operation default (JPEG Q 75, PNG compression 6, ...) |
//! | `Zero` | literal zero |
//! | `Value(v)` | `v` |
//!
//! `translate()` turns a record into the engine's argument record in one step.
//! Arrays, interpolators and profile names allocated here belong to the
//! returned record and are released when it is dropped, whether or not the
//! primitive succeeded.

use crate::engine::args::{ArrayDouble, ArrayInt, Interpolate, InterpolateKind, NativeString};
use crate::engine::colour::{ColourspaceArgs, FlattenArgs, IccTransformArgs};
use crate::engine::filter::{BlurArgs, SharpenArgs};
use crate::engine::geometry::{AffineArgs, EmbedArgs, SimilarityArgs};
use crate::engine::load::{GifLoadArgs, JpegLoadArgs, LoadArgs, WebpLoadArgs};
use crate::engine::save::{JpegSaveArgs, PngSaveArgs, WebpSaveArgs};
use crate::engine::{Access, Extend, Intent, Interpretation, PngFilter, Precision, QuantTable, WebpPreset};

/// A defaultable option value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Setting<T> {
    #[default]
    Unset,
    /// Explicitly zero, off, or empty.
    Zero,
    Value(T),
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Setting::Value(value)
    }
}

impl<T: Copy + Default> Setting<T> {
    pub fn resolve(&self, default: T) -> T {
        match self {
            Setting::Unset => default,
            Setting::Zero => T::default(),
            Setting::Value(v) => *v,
        }
    }
}

impl Setting<String> {
    /// Unset leaves the engine to choose; Zero passes an empty name.
    fn native(&self) -> Option<NativeString> {
        match self {
            Setting::Unset => None,
            Setting::Zero => Some(NativeString::new("")),
            Setting::Value(name) => Some(NativeString::new(name)),
        }
    }
}

// =========================================================================
// Decode
// =========================================================================

/// Hints shared by every decoder. Passed through, not interpreted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
    pub access: Access,
    /// Keep very large sources on disk.
    pub disc: bool,
}

impl DecodeOptions {
    pub fn translate(&self) -> LoadArgs {
        LoadArgs {
            access: self.access,
            disc: self.disc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JpegDecodeOptions {
    pub base: DecodeOptions,
    /// Shrink-on-load, default 1. Snapped down to 1, 2, 4 or 8.
    pub shrink: Setting<u32>,
    pub fail: bool,
    pub autorotate: bool,
}

impl JpegDecodeOptions {
    pub fn translate(&self) -> JpegLoadArgs {
        let shrink = match self.shrink.resolve(1) {
            0..=1 => 1,
            2..=3 => 2,
            4..=7 => 4,
            _ => 8,
        };
        JpegLoadArgs {
            base: self.base.translate(),
            shrink,
            fail: self.fail,
            autorotate: self.autorotate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GifDecodeOptions {
    pub base: DecodeOptions,
    pub page: Setting<u32>,
}

impl GifDecodeOptions {
    pub fn translate(&self) -> GifLoadArgs {
        GifLoadArgs {
            base: self.base.translate(),
            page: self.page.resolve(0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebpDecodeOptions {
    pub base: DecodeOptions,
    pub shrink: Setting<u32>,
}

impl WebpDecodeOptions {
    pub fn translate(&self) -> WebpLoadArgs {
        WebpLoadArgs {
            base: self.base.translate(),
            shrink: self.shrink.resolve(1),
        }
    }
}

// =========================================================================
// Encode
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JpegEncodeOptions {
    pub quality: Setting<i32>,
    pub profile: Setting<String>,
    pub optimize_coding: bool,
    pub interlace: bool,
    pub strip: bool,
    pub no_subsample: bool,
    pub trellis_quant: bool,
    pub overshoot_deringing: bool,
    pub optimize_scans: bool,
    pub quant_table: Setting<u8>,
}

impl JpegEncodeOptions {
    pub const DEFAULT_QUALITY: i32 = 75;

    pub fn translate(&self) -> JpegSaveArgs {
        JpegSaveArgs {
            quality: self.quality.resolve(Self::DEFAULT_QUALITY),
            profile: self.profile.native(),
            optimize_coding: self.optimize_coding,
            interlace: self.interlace,
            strip: self.strip,
            no_subsample: self.no_subsample,
            trellis_quant: self.trellis_quant,
            overshoot_deringing: self.overshoot_deringing,
            optimize_scans: self.optimize_scans,
            quant_table: QuantTable(self.quant_table.resolve(0)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PngEncodeOptions {
    pub compression: Setting<i32>,
    pub interlace: bool,
    pub profile: Setting<String>,
    pub filter: PngFilter,
}

impl PngEncodeOptions {
    pub const DEFAULT_COMPRESSION: i32 = 6;

    pub fn translate(&self) -> PngSaveArgs {
        PngSaveArgs {
            compression: self.compression.resolve(Self::DEFAULT_COMPRESSION),
            interlace: self.interlace,
            profile: self.profile.native(),
            filter: self.filter,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebpEncodeOptions {
    pub quality: Setting<i32>,
    pub lossless: bool,
    pub preset: WebpPreset,
    pub smart_subsample: bool,
    pub near_lossless: bool,
    pub alpha_quality: Setting<i32>,
}

impl WebpEncodeOptions {
    pub const DEFAULT_QUALITY: i32 = 75;

    pub fn translate(&self) -> WebpSaveArgs {
        WebpSaveArgs {
            quality: self.quality.resolve(Self::DEFAULT_QUALITY),
            lossless: self.lossless,
            preset: self.preset,
            smart_subsample: self.smart_subsample,
            near_lossless: self.near_lossless,
            alpha_quality: self.alpha_quality.resolve(100),
        }
    }
}

// =========================================================================
// Geometry
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedOptions {
    pub extend: Extend,
    /// Used with [`Extend::Background`]. One value is replicated per band.
    pub background: Option<Vec<f64>>,
}

impl EmbedOptions {
    pub fn translate(&self, x: i32, y: i32, width: i32, height: i32) -> EmbedArgs {
        EmbedArgs {
            x,
            y,
            width,
            height,
            extend: self.extend,
            background: self.background.as_deref().map(ArrayDouble::new),
        }
    }
}

/// Offsets shared by affine and similarity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Offsets {
    pub idx: Setting<f64>,
    pub idy: Setting<f64>,
    pub odx: Setting<f64>,
    pub ody: Setting<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffineOptions {
    /// Defaults to bilinear.
    pub interpolate: Option<InterpolateKind>,
    /// `[left, top, width, height]` of the output.
    pub output_area: Option<[i32; 4]>,
    pub offsets: Offsets,
}

impl AffineOptions {
    pub fn translate(&self, matrix: [f64; 4]) -> AffineArgs {
        AffineArgs {
            matrix,
            interpolate: interpolator(self.interpolate),
            output_area: self.output_area.as_ref().map(|area| ArrayInt::new(area)),
            idx: self.offsets.idx.resolve(0.0),
            idy: self.offsets.idy.resolve(0.0),
            odx: self.offsets.odx.resolve(0.0),
            ody: self.offsets.ody.resolve(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityOptions {
    pub scale: Setting<f64>,
    /// Degrees.
    pub angle: Setting<f64>,
    pub interpolate: Option<InterpolateKind>,
    pub offsets: Offsets,
}

impl SimilarityOptions {
    pub fn translate(&self) -> SimilarityArgs {
        SimilarityArgs {
            scale: self.scale.resolve(1.0),
            angle: self.angle.resolve(0.0),
            interpolate: interpolator(self.interpolate),
            idx: self.offsets.idx.resolve(0.0),
            idy: self.offsets.idy.resolve(0.0),
            odx: self.offsets.odx.resolve(0.0),
            ody: self.offsets.ody.resolve(0.0),
        }
    }
}

fn interpolator(kind: Option<InterpolateKind>) -> Interpolate {
    let kind = kind.unwrap_or(InterpolateKind::Bilinear);
    Interpolate::from_kind(kind)
}

// =========================================================================
// Filters and colour
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlurOptions {
    pub precision: Precision,
    pub min_ampl: Setting<f64>,
}

impl BlurOptions {
    pub fn translate(&self, sigma: f64) -> BlurArgs {
        BlurArgs {
            sigma,
            precision: self.precision,
            min_ampl: self.min_ampl.resolve(0.2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharpenOptions {
    pub sigma: Setting<f64>,
    pub x1: Setting<f64>,
    pub y2: Setting<f64>,
    pub y3: Setting<f64>,
    pub m1: Setting<f64>,
    pub m2: Setting<f64>,
}

impl SharpenOptions {
    pub fn translate(&self) -> SharpenArgs {
        SharpenArgs {
            sigma: self.sigma.resolve(0.5),
            x1: self.x1.resolve(2.0),
            y2: self.y2.resolve(10.0),
            y3: self.y3.resolve(20.0),
            m1: self.m1.resolve(0.0),
            m2: self.m2.resolve(3.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenOptions {
    /// Defaults to black.
    pub background: Option<Vec<f64>>,
    pub max_alpha: Setting<f64>,
}

impl FlattenOptions {
    pub fn translate(&self) -> FlattenArgs {
        FlattenArgs {
            background: self.background.as_deref().map(ArrayDouble::new),
            max_alpha: self.max_alpha.resolve(255.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColourspaceOptions {
    /// Defaults to the image's own interpretation.
    pub source_space: Option<Interpretation>,
}

impl ColourspaceOptions {
    pub fn translate(&self, space: Interpretation, current: Interpretation) -> ColourspaceArgs {
        ColourspaceArgs {
            space,
            source_space: self.source_space.unwrap_or(current),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IccTransformOptions {
    /// Profile assumed when the image has none. Zero means built-in sRGB.
    pub input_profile: Setting<String>,
    pub intent: Intent,
    pub depth: Setting<u32>,
    /// Use the embedded profile even when an input profile is given.
    pub embedded: bool,
}

impl IccTransformOptions {
    pub fn translate(&self, output_profile: &str) -> IccTransformArgs {
        IccTransformArgs {
            output_profile: NativeString::new(output_profile),
            input_profile: self.input_profile.native(),
            intent: self.intent,
            depth: self.depth.resolve(8),
            embedded: self.embedded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::args::outstanding;

    #[test]
    fn unset_takes_the_operation_default() {
        let jpeg = JpegEncodeOptions::default().translate();
        assert_eq!(jpeg.quality, 75);
        let png = PngEncodeOptions::default().translate();
        assert_eq!(png.compression, 6);
        let webp = WebpEncodeOptions::default().translate();
        assert_eq!((webp.quality, webp.alpha_quality), (75, 100));
    }

    #[test]
    fn zero_sentinel_means_literal_zero() {
        let options = JpegEncodeOptions {
            quality: Setting::Zero,
            ..Default::default()
        };
        assert_eq!(options.translate().quality, 0);

        let png = PngEncodeOptions {
            compression: Setting::Zero,
            ..Default::default()
        };
        assert_eq!(png.translate().compression, 0);
    }

    #[test]
    fn explicit_values_pass_through() {
        let options = JpegEncodeOptions {
            quality: 92.into(),
            ..Default::default()
        };
        assert_eq!(options.translate().quality, 92);
    }

    #[test]
    fn jpeg_shrink_snaps_to_supported_factors() {
        let snapped: Vec<u32> = [0, 1, 2, 3, 5, 8, 20]
            .into_iter()
            .map(|s| {
                JpegDecodeOptions {
                    shrink: s.into(),
                    ..Default::default()
                }
                .translate()
                .shrink
            })
            .collect();
        assert_eq!(snapped, vec![1, 1, 2, 2, 4, 8, 8]);
        assert_eq!(JpegDecodeOptions::default().translate().shrink, 1);
    }

    #[test]
    fn sharpen_defaults() {
        let args = SharpenOptions::default().translate();
        assert_eq!(
            (args.sigma, args.x1, args.y2, args.y3, args.m1, args.m2),
            (0.5, 2.0, 10.0, 20.0, 0.0, 3.0)
        );
        let flat = SharpenOptions {
            m2: Setting::Zero,
            ..Default::default()
        }
        .translate();
        assert_eq!(flat.m2, 0.0);
        assert_eq!(flat.sigma, 0.5);
    }

    #[test]
    fn blur_and_similarity_defaults() {
        let blur = BlurOptions::default().translate(3.0);
        assert_eq!((blur.sigma, blur.min_ampl), (3.0, 0.2));
        assert_eq!(blur.precision, Precision::Integer);

        let similarity = SimilarityOptions::default().translate();
        assert_eq!((similarity.scale, similarity.angle), (1.0, 0.0));
        assert_eq!(similarity.interpolate.kind(), InterpolateKind::Bilinear);
    }

    #[test]
    fn profile_settings_map_to_optional_names() {
        assert!(JpegEncodeOptions::default().translate().profile.is_none());
        let none = JpegEncodeOptions {
            profile: Setting::Zero,
            ..Default::default()
        }
        .translate();
        assert_eq!(none.profile.as_ref().map(NativeString::as_str), Some(""));
        let named = JpegEncodeOptions {
            profile: Setting::Value("srgb".to_string()),
            ..Default::default()
        }
        .translate();
        assert_eq!(named.profile.as_ref().map(NativeString::as_str), Some("srgb"));
    }

    #[test]
    fn colourspace_source_defaults_to_current() {
        let args = ColourspaceOptions::default().translate(Interpretation::Lab, Interpretation::Srgb);
        assert_eq!(args.source_space, Interpretation::Srgb);
        let forced = ColourspaceOptions {
            source_space: Some(Interpretation::Rgb),
        }
        .translate(Interpretation::Lab, Interpretation::Srgb);
        assert_eq!(forced.source_space, Interpretation::Rgb);
    }

    #[test]
    fn transient_arguments_are_released_with_the_record() {
        let before = outstanding();
        let affine = AffineOptions {
            output_area: Some([0, 0, 10, 10]),
            ..Default::default()
        }
        .translate([1.0, 0.0, 0.0, 1.0]);
        let icc = IccTransformOptions {
            input_profile: Setting::Zero,
            ..Default::default()
        }
        .translate("srgb");
        // interpolator + area + output name + input name
        assert_eq!(outstanding(), before + 4);
        drop(affine);
        drop(icc);
        assert_eq!(outstanding(), before);
    }
}
