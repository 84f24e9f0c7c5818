//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Success
//!
//! ```text
//! Notice: Blur not supported by the software backend, output is not blurred
//! Wrote out/photo.jpg (jpeg, 1152x864)
//! Timing Data:
//!   Decode: 41.2ms
//!   Crop: 0ns
//!   Resize: 12.9ms
//!   Blur: 0ns
//!   Encode: 18.4ms
//!   Total: 72.6ms
//! ```
//!
//! ## Failure
//!
//! ```text
//! Crop failed: Failed to crop image
//! extract_area: bad extract area
//! ```
//!
//! The second part is the engine's error buffer, shown with `-v` only.
//!
//! # Architecture
//!
//! Each piece has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::{PipelineOutput, Stage, StageTimings};
use std::path::Path;

const STAGES: [Stage; 5] = [
    Stage::Decode,
    Stage::Crop,
    Stage::Resize,
    Stage::Blur,
    Stage::Encode,
];

// ============================================================================
// Success
// ============================================================================

/// Per-stage and total durations, one per line.
pub fn format_timings(timings: &StageTimings) -> Vec<String> {
    let mut lines = vec!["Timing Data:".to_string()];
    for stage in STAGES {
        lines.push(format!("  {}: {:?}", stage, timings.get(stage)));
    }
    lines.push(format!("  Total: {:?}", timings.total));
    lines
}

/// One `Notice:` line per skipped stage.
pub fn format_notices(notices: &[String]) -> Vec<String> {
    notices.iter().map(|n| format!("Notice: {n}")).collect()
}

/// Notices, the written file, then timings.
pub fn format_success(output: &PipelineOutput, destination: &Path) -> Vec<String> {
    let mut lines = format_notices(&output.notices);
    lines.push(format!(
        "Wrote {} ({}, {}x{})",
        destination.display(),
        output.format.name(),
        output.dimensions.width,
        output.dimensions.height
    ));
    lines.extend(format_timings(&output.timings));
    lines
}

pub fn print_success(output: &PipelineOutput, destination: &Path) {
    for line in format_success(output, destination) {
        println!("{}", line);
    }
}

// ============================================================================
// Failure
// ============================================================================

/// The error, then the engine's buffered diagnostics when there are any.
pub fn format_failure(error: &dyn std::error::Error, engine_buffer: Option<&str>) -> Vec<String> {
    let mut lines = vec![error.to_string()];
    if let Some(buffer) = engine_buffer {
        lines.extend(buffer.lines().map(str::to_string));
    }
    lines
}

pub fn print_failure(error: &dyn std::error::Error, engine_buffer: Option<&str>) {
    for line in format_failure(error, engine_buffer) {
        println!("{}", line);
    }
}
