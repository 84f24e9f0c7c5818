//! Enumerations shared by the engine primitives and the option records.

/// Band storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandFormat {
    UChar,
    Float,
}

/// How the bands of an image should be understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpretation {
    Error,
    Multiband,
    BW,
    Xyz,
    Lab,
    Cmyk,
    Rgb,
    Srgb,
    ScRgb,
    Grey16,
    Rgb16,
}

impl Interpretation {
    pub fn name(self) -> &'static str {
        match self {
            Interpretation::Error => "error",
            Interpretation::Multiband => "multiband",
            Interpretation::BW => "b-w",
            Interpretation::Xyz => "xyz",
            Interpretation::Lab => "lab",
            Interpretation::Cmyk => "cmyk",
            Interpretation::Rgb => "rgb",
            Interpretation::Srgb => "srgb",
            Interpretation::ScRgb => "scrgb",
            Interpretation::Grey16 => "grey16",
            Interpretation::Rgb16 => "rgb16",
        }
    }
}

/// Scan pattern a consumer intends to use on a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Random,
    Sequential,
    SequentialUnbuffered,
}

/// Edge handling for [`embed`](super::geometry::embed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extend {
    #[default]
    Black,
    Copy,
    Repeat,
    Mirror,
    White,
    Background,
}

/// Resampling kernel for reduce and resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Kernel {
    Nearest,
    Linear,
    Cubic,
    Lanczos2,
    #[default]
    Lanczos3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    Integer,
    Float,
    Approximate,
}

/// Rendering intent for ICC transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Intent {
    #[default]
    Perceptual,
    Relative,
    Saturation,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PngFilter {
    #[default]
    None,
    Sub,
    Up,
    Avg,
    Paeth,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WebpPreset {
    #[default]
    Default,
    Picture,
    Photo,
    Drawing,
    Icon,
    Text,
}

/// JPEG quantization table selection (0 is the Annex K table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuantTable(pub u8);
