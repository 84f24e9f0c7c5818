//! # dualscale
//!
//! Decode, crop, resize, blur and re-encode a single image on one of two
//! interchangeable backends: an in-process accelerated engine, or a pure
//! software path built on the `image` crate.
//!
//! # Architecture: Two Layers, One Pipeline
//!
//! ```text
//! CLI (main.rs)
//!   └── pipeline   Decode → [Crop] → [Resize] → [Blur] → Encode
//!         └── ImageBackend
//!               ├── EngineBackend  →  imaging::ops  →  engine primitives
//!               └── RustBackend    →  image / imageops
//! ```
//!
//! The engine is a libvips-shaped library: a global lifecycle, immutable
//! reference-counted images, one primitive per operation, and failures
//! reported as a bare status plus a thread-local error buffer. The
//! [`imaging`] layer wraps it in owned handles, typed option records and
//! `Result`-returning operations.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Accelerated engine: lifecycle, cache, worker pool, primitives |
//! | [`imaging`] | Handles, options, dispatcher, resize math, both backends, pixel views |
//! | [`pipeline`] | Stage orchestration, timings, remote sources, file I/O |
//! | [`config`] | `dualscale.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Handles Release Themselves
//!
//! An engine image is an [`imaging::Image`]: not `Clone`, released exactly
//! once when dropped or passed to [`imaging::Image::release`]. Use after
//! release does not compile.
//!
//! ## Zero Is Not "Unset"
//!
//! Option records use [`imaging::Setting`], which keeps "not given" apart
//! from "explicitly zero". Asking for JPEG quality 0 really sends 0 to the
//! encoder instead of silently falling back to the default.
//!
//! ## Resize Never Upscales
//!
//! Both backends compute the same fit plan ([`imaging::plan_fit`]), so fast
//! and direct resizes land on identical output dimensions, and sources that
//! already fit are passed through untouched.

pub mod config;
pub mod engine;
pub mod imaging;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
