//! Pure calculation functions for fit-within-box resizing.
//!
//! All functions here are pure and testable without any I/O or images. Both
//! backends take a [`FitPlan`] from [`plan_fit`] and only differ in which
//! primitives they use to carry it out.

use super::backend::Dimensions;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    #[error("Target box must be non-zero, got {width}x{height}")]
    ZeroTarget { width: u32, height: u32 },
    #[error("Source image has zero area")]
    ZeroSource,
}

/// Uniform scale that fits `source` inside `target`.
///
/// # Examples
/// ```
/// # use dualscale::imaging::calculations::fit_scale;
/// assert_eq!(fit_scale((4608, 3456), (1152, 1152)), 0.25);
/// ```
pub fn fit_scale(source: (u32, u32), target: (u32, u32)) -> f64 {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    (tgt_w as f64 / src_w as f64).min(tgt_h as f64 / src_h as f64)
}

/// Integer factor for the cheap first pass: `max(1, floor(1 / (2s)))`.
///
/// Leaves at least twice the final resolution for the precise pass.
pub fn pre_shrink_factor(scale: f64) -> u32 {
    (1.0 / (scale * 2.0)).floor().max(1.0) as u32
}

/// `round(dim × scale)`, half away from zero, never below one pixel.
pub fn scaled_dimension(dim: u32, scale: f64) -> u32 {
    ((dim as f64 * scale).round() as u32).max(1)
}

/// What a fit-within-box resize has to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPlan {
    pub scale: f64,
    /// Integer pre-shrink factor; 1 means go straight to the precise pass.
    pub pre_shrink: u32,
    /// Final output size.
    pub output: Dimensions,
}

/// Plan a fit of `source` into `target`.
///
/// Returns `Ok(None)` when the source already fits: this path never upscales.
pub fn plan_fit(source: Dimensions, target: (u32, u32), fast: bool) -> Result<Option<FitPlan>, FitError> {
    let (width, height) = target;
    if width == 0 || height == 0 {
        return Err(FitError::ZeroTarget { width, height });
    }
    if source.width == 0 || source.height == 0 {
        return Err(FitError::ZeroSource);
    }
    let scale = fit_scale((source.width, source.height), target);
    if scale >= 1.0 {
        return Ok(None);
    }
    let pre_shrink = if fast { pre_shrink_factor(scale) } else { 1 };
    Ok(Some(FitPlan {
        scale,
        pre_shrink,
        output: Dimensions {
            width: scaled_dimension(source.width, scale),
            height: scaled_dimension(source.height, scale),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // =========================================================================
    // fit_scale / pre_shrink_factor
    // =========================================================================

    #[test]
    fn scale_is_limited_by_the_tighter_axis() {
        assert_eq!(fit_scale((800, 600), (400, 400)), 0.5);
        assert_eq!(fit_scale((600, 800), (400, 400)), 0.5);
        assert_eq!(fit_scale((1000, 100), (500, 500)), 0.5);
    }

    #[test]
    fn pre_shrink_keeps_twice_the_target() {
        assert_eq!(pre_shrink_factor(0.25), 2);
        assert_eq!(pre_shrink_factor(0.1), 5);
        assert_eq!(pre_shrink_factor(0.3), 1);
        assert_eq!(pre_shrink_factor(0.9), 1);
    }

    // =========================================================================
    // scaled_dimension
    // =========================================================================

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(scaled_dimension(5, 0.5), 3);
        assert_eq!(scaled_dimension(3, 0.5), 2);
        assert_eq!(scaled_dimension(4, 0.5), 2);
    }

    #[test]
    fn never_rounds_to_zero() {
        assert_eq!(scaled_dimension(10, 0.01), 1);
    }

    // =========================================================================
    // plan_fit
    // =========================================================================

    #[test]
    fn large_photo_into_square_box() {
        let plan = plan_fit(dims(4608, 3456), (1152, 1152), true).unwrap().unwrap();
        assert_eq!(plan.scale, 0.25);
        assert_eq!(plan.pre_shrink, 2);
        assert_eq!(plan.output, dims(1152, 864));
    }

    #[test]
    fn fast_and_direct_plans_agree_on_output() {
        let fast = plan_fit(dims(3001, 1999), (640, 480), true).unwrap().unwrap();
        let direct = plan_fit(dims(3001, 1999), (640, 480), false).unwrap().unwrap();
        assert_eq!(fast.output, direct.output);
        assert_eq!(direct.pre_shrink, 1);
        assert!(fast.pre_shrink > 1);
    }

    #[test]
    fn no_upscaling_when_source_fits() {
        assert_eq!(plan_fit(dims(300, 200), (300, 200), true).unwrap(), None);
        assert_eq!(plan_fit(dims(300, 200), (1000, 1000), false).unwrap(), None);
    }

    #[test]
    fn zero_target_is_rejected() {
        assert_eq!(
            plan_fit(dims(300, 200), (0, 100), false),
            Err(FitError::ZeroTarget {
                width: 0,
                height: 100
            })
        );
    }

    #[test]
    fn zero_source_is_rejected() {
        assert_eq!(plan_fit(dims(0, 200), (10, 10), false), Err(FitError::ZeroSource));
    }
}
