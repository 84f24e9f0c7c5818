//! Image processing on two interchangeable backends.
//!
//! | Layer | Module |
//! |---|---|
//! | **Handle** | [`Image`]: owned engine image, released exactly once |
//! | **Options** | per-operation records with three-state defaults, translated to engine arguments |
//! | **Dispatcher** | [`ops`]: one function per engine primitive |
//! | **Resize math** | [`calculations`]: fit scale, pre-shrink factor, output size |
//! | **Backends** | [`ImageBackend`] + [`EngineBackend`] + [`RustBackend`] |
//! | **Pixel views** | [`RgbaView`], [`CmykView`], [`GrayView`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a pipeline request
//! - **Backend**: the stage trait both backends implement
//! - **Operations**: typed wrappers over the engine primitives

pub mod adapter;
pub mod backend;
pub mod calculations;
pub mod engine_backend;
mod handle;
pub mod ops;
pub mod options;
pub mod params;
pub mod rust_backend;

pub use adapter::{AdapterError, Cmyk, CmykView, GrayView, PixelView, RgbaView};
pub use backend::{BackendError, Dimensions, ImageBackend, SourceFormat};
pub use calculations::{FitError, FitPlan, plan_fit};
pub use engine_backend::EngineBackend;
pub use handle::Image;
pub use options::Setting;
pub use params::{CropRect, FitBox, ParamError, Quality, Scaler};
pub use rust_backend::RustBackend;
