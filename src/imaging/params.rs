//! Parameter types for pipeline requests.
//!
//! These describe *what* to do, not *how*: the CLI and config parse into them
//! and both backends read them.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1-100, default 85). Clamped on construction.
//! - [`Scaler`]: software-backend resampling kernel, selected by name.
//! - [`CropRect`]: crop rectangle, written `XxYyWwHh` (e.g. `0x50y400w300h`).
//! - [`FitBox`]: fit-within-box target, written `WxH` (e.g. `300x300`).

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Invalid crop: {0} (expected e.g. 0x50y400w300h)")]
    InvalidCrop(String),
    #[error("Invalid resize: {0} (expected e.g. 300x300)")]
    InvalidBox(String),
    #[error("Unknown scaler: {0} (one of: {names})", names = Scaler::NAMES.join(", "))]
    UnknownScaler(String),
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Resampling kernel for the software backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scaler {
    NearestNeighbor,
    #[default]
    Bilinear,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Scaler {
    pub const NAMES: [&'static str; 5] = [
        "nearest-neighbor",
        "bilinear",
        "catmull-rom",
        "gaussian",
        "lanczos3",
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scaler::NearestNeighbor => Self::NAMES[0],
            Scaler::Bilinear => Self::NAMES[1],
            Scaler::CatmullRom => Self::NAMES[2],
            Scaler::Gaussian => Self::NAMES[3],
            Scaler::Lanczos3 => Self::NAMES[4],
        }
    }

    pub fn filter(self) -> FilterType {
        match self {
            Scaler::NearestNeighbor => FilterType::Nearest,
            Scaler::Bilinear => FilterType::Triangle,
            Scaler::CatmullRom => FilterType::CatmullRom,
            Scaler::Gaussian => FilterType::Gaussian,
            Scaler::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for Scaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case, `-` and `_` are ignored, so `CatmullRom`, `catmull-rom` and
/// `catmull_rom` all parse. `approx-bilinear` is accepted for bilinear.
impl FromStr for Scaler {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "nearestneighbor" | "nearest" => Ok(Scaler::NearestNeighbor),
            "bilinear" | "approxbilinear" => Ok(Scaler::Bilinear),
            "catmullrom" => Ok(Scaler::CatmullRom),
            "gaussian" => Ok(Scaler::Gaussian),
            "lanczos3" => Ok(Scaler::Lanczos3),
            _ => Err(ParamError::UnknownScaler(s.to_string())),
        }
    }
}

impl From<Scaler> for String {
    fn from(scaler: Scaler) -> Self {
        scaler.name().to_string()
    }
}

impl TryFrom<String> for Scaler {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Crop rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for CropRect {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParamError::InvalidCrop(s.to_string());
        let mut rest = s;
        let mut fields = [0u32; 4];
        for (field, marker) in fields.iter_mut().zip(['x', 'y', 'w', 'h']) {
            let (value, tail) = rest.split_once(marker).ok_or_else(invalid)?;
            *field = value.parse().map_err(|_| invalid())?;
            rest = tail;
        }
        let [x, y, width, height] = fields;
        if !rest.is_empty() || width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(CropRect {
            x,
            y,
            width,
            height,
        })
    }
}

/// Fit-within-box target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitBox {
    pub width: u32,
    pub height: u32,
}

impl FromStr for FitBox {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParamError::InvalidBox(s.to_string());
        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = width.parse().map_err(|_| invalid())?;
        let height: u32 = height.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(FitBox { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn scaler_accepts_several_spellings() {
        for name in ["CatmullRom", "catmull-rom", "catmull_rom"] {
            assert_eq!(name.parse::<Scaler>().unwrap(), Scaler::CatmullRom);
        }
        assert_eq!("ApproxBiLinear".parse::<Scaler>().unwrap(), Scaler::Bilinear);
        assert_eq!("NearestNeighbor".parse::<Scaler>().unwrap(), Scaler::NearestNeighbor);
        assert!(matches!(
            "cubic".parse::<Scaler>(),
            Err(ParamError::UnknownScaler(_))
        ));
    }

    #[test]
    fn scaler_names_round_trip() {
        for name in Scaler::NAMES {
            assert_eq!(name.parse::<Scaler>().unwrap().name(), name);
        }
    }

    #[test]
    fn crop_parses_all_four_fields() {
        assert_eq!(
            "0x50y400w300h".parse::<CropRect>().unwrap(),
            CropRect {
                x: 0,
                y: 50,
                width: 400,
                height: 300
            }
        );
    }

    #[test]
    fn crop_rejects_malformed_input() {
        for bad in ["", "0x50y400w", "0x50y400w300", "ax50y400w300h", "0x50y0w300h", "0x50y400w300hz"] {
            assert!(bad.parse::<CropRect>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn fit_box_parses() {
        assert_eq!(
            "300x200".parse::<FitBox>().unwrap(),
            FitBox {
                width: 300,
                height: 200
            }
        );
        assert!("300".parse::<FitBox>().is_err());
        assert!("300x-1".parse::<FitBox>().is_err());
    }

    #[test]
    fn fit_box_rejects_zero_side() {
        for bad in ["0x0", "0x200", "300x0"] {
            assert_eq!(
                bad.parse::<FitBox>(),
                Err(ParamError::InvalidBox(bad.to_string()))
            );
        }
    }
}
