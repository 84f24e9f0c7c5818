//! Transient arguments built while translating options.
//!
//! Arrays, interpolators and profile names are allocated for a single
//! primitive call and released when they go out of scope, on success and
//! failure alike. A per-thread counter tracks how many are alive so the
//! release discipline can be observed.

use std::cell::Cell;

thread_local! {
    static OUTSTANDING: Cell<usize> = const { Cell::new(0) };
}

fn acquire() {
    OUTSTANDING.with(|count| count.set(count.get() + 1));
}

fn release() {
    OUTSTANDING.with(|count| count.set(count.get().saturating_sub(1)));
}

/// Number of transient arguments alive on the current thread.
pub fn outstanding() -> usize {
    OUTSTANDING.with(Cell::get)
}

#[derive(Debug)]
pub struct ArrayDouble(Vec<f64>);

impl ArrayDouble {
    pub fn new(values: &[f64]) -> Self {
        acquire();
        Self(values.to_vec())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Drop for ArrayDouble {
    fn drop(&mut self) {
        release();
    }
}

#[derive(Debug)]
pub struct ArrayInt(Vec<i32>);

impl ArrayInt {
    pub fn new(values: &[i32]) -> Self {
        acquire();
        Self(values.to_vec())
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }
}

impl Drop for ArrayInt {
    fn drop(&mut self) {
        release();
    }
}

/// A string handed to the engine, such as a profile name or path.
#[derive(Debug)]
pub struct NativeString(String);

impl NativeString {
    pub fn new(value: &str) -> Self {
        acquire();
        Self(value.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        release();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpolateKind {
    Nearest,
    Bilinear,
    Bicubic,
}

impl InterpolateKind {
    pub fn nickname(self) -> &'static str {
        match self {
            InterpolateKind::Nearest => "nearest",
            InterpolateKind::Bilinear => "bilinear",
            InterpolateKind::Bicubic => "bicubic",
        }
    }
}

#[derive(Debug)]
pub struct Interpolate {
    kind: InterpolateKind,
}

impl Interpolate {
    /// Look up an interpolator by nickname.
    pub fn new(nickname: &str) -> Option<Self> {
        let kind = match nickname {
            "nearest" => InterpolateKind::Nearest,
            "bilinear" => InterpolateKind::Bilinear,
            "bicubic" => InterpolateKind::Bicubic,
            _ => return None,
        };
        Some(Self::from_kind(kind))
    }

    pub fn from_kind(kind: InterpolateKind) -> Self {
        acquire();
        Self { kind }
    }

    pub fn kind(&self) -> InterpolateKind {
        self.kind
    }
}

impl Drop for Interpolate {
    fn drop(&mut self) {
        release();
    }
}
