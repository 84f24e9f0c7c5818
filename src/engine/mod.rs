//! The accelerated image engine.
//!
//! An in-process engine with a libvips-shaped surface: global lifecycle,
//! immutable reference-counted images, a memoizing operation cache, a worker
//! pool for row-parallel kernels, and one primitive per operation. Primitives
//! report failure as a bare status and leave the reason in a thread-local
//! error buffer, which callers read (and clear) with [`error_buffer`].
//!
//! ## Lifecycle
//!
//! ```text
//! initialize()  →  configure(..)*  →  primitives ...  →  shutdown()
//! ```
//!
//! [`initialize`] is guarded by a lock around a check-then-set flag and is a
//! no-op once it has succeeded. [`configure`] may be called any number of
//! times after initialization; each call applies to every later operation in
//! the process. [`shutdown`] is idempotent. [`thread_cleanup`] drops
//! thread-local state without touching global state.
//!
//! Most callers should use the typed layer in [`crate::imaging`] rather than
//! the primitives directly.

pub mod args;
pub(crate) mod cache;
pub mod colour;
mod error;
pub mod filter;
pub mod geometry;
pub mod load;
pub mod raw;
pub mod region;
pub mod save;
pub mod types;

pub use error::EngineError;
pub use raw::{Pixels, RawImage};
pub use region::{Rect, Region};
pub use types::*;

use std::cell::RefCell;
use std::fmt::{Display, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub const DEFAULT_CACHE_MAX: usize = 1000;
pub const DEFAULT_CACHE_MAX_FILES: usize = 100;
pub const DEFAULT_CACHE_MAX_MEMORY: usize = 100 * 1024 * 1024;

/// Global engine settings. Zero fields take the engine default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Worker threads for internal parallelism. 0 = one per core.
    pub concurrency: usize,
    pub cache_max: usize,
    pub cache_max_files: usize,
    pub cache_max_memory: usize,
}

impl EngineConfig {
    pub fn resolved(self) -> Self {
        fn or(value: usize, default: usize) -> usize {
            if value == 0 { default } else { value }
        }
        Self {
            concurrency: self.concurrency,
            cache_max: or(self.cache_max, DEFAULT_CACHE_MAX),
            cache_max_files: or(self.cache_max_files, DEFAULT_CACHE_MAX_FILES),
            cache_max_memory: or(self.cache_max_memory, DEFAULT_CACHE_MAX_MEMORY),
        }
    }
}

struct EngineState {
    config: EngineConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

static INIT_LOCK: Mutex<()> = Mutex::new(());
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static STATE: RwLock<EngineState> = RwLock::new(EngineState {
    config: EngineConfig {
        concurrency: 0,
        cache_max: DEFAULT_CACHE_MAX,
        cache_max_files: DEFAULT_CACHE_MAX_FILES,
        cache_max_memory: DEFAULT_CACHE_MAX_MEMORY,
    },
    pool: None,
});

thread_local! {
    static ERROR_BUFFER: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Start the engine. Safe to call repeatedly.
pub fn initialize() -> Result<(), EngineError> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }
    let config = EngineConfig::default().resolved();
    let pool = build_pool(config.concurrency).ok_or(EngineError::Initialize)?;
    apply(config, pool);
    INITIALIZED.store(true, Ordering::Release);
    tracing::debug!("engine initialized");
    Ok(())
}

/// Start the engine and apply `config` in one step.
pub fn initialize_with(config: EngineConfig) -> Result<(), EngineError> {
    initialize()?;
    configure(config)
}

/// Change the global settings. Fails if the engine has not been initialized.
pub fn configure(config: EngineConfig) -> Result<(), EngineError> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if !INITIALIZED.load(Ordering::Acquire) {
        record("configure", "engine not initialized");
        return Err(EngineError::Configure);
    }
    let config = config.resolved();
    let pool = build_pool(config.concurrency).ok_or(EngineError::Configure)?;
    apply(config, pool);
    tracing::debug!(?config, "engine configured");
    Ok(())
}

/// Tear down global state: drops the cache and the worker pool.
pub fn shutdown() {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if !INITIALIZED.swap(false, Ordering::AcqRel) {
        return;
    }
    cache::global().clear();
    let mut state = STATE.write().unwrap_or_else(PoisonError::into_inner);
    state.pool = None;
    tracing::debug!("engine shut down");
}

/// Release thread-local engine resources, leaving global state alone.
pub fn thread_cleanup() {
    ERROR_BUFFER.with(|buffer| buffer.borrow_mut().clear());
}

/// Take the accumulated error text for this thread, clearing it.
pub fn error_buffer() -> Option<String> {
    let text = ERROR_BUFFER.with(|buffer| std::mem::take(&mut *buffer.borrow_mut()));
    if text.is_empty() { None } else { Some(text) }
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Settings currently in force.
pub fn current_config() -> EngineConfig {
    STATE.read().unwrap_or_else(PoisonError::into_inner).config
}

fn build_pool(concurrency: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .thread_name(|i| format!("engine-worker-{i}"))
        .build()
        .map_err(|e| record("threadpool", e))
        .ok()
}

fn apply(config: EngineConfig, pool: rayon::ThreadPool) {
    cache::global().set_limits(config.cache_max, config.cache_max_files, config.cache_max_memory);
    let mut state = STATE.write().unwrap_or_else(PoisonError::into_inner);
    state.config = config;
    state.pool = Some(Arc::new(pool));
}

/// Marker returned by a primitive that failed. The reason is in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Failed;

pub(crate) type Status<T> = Result<T, Failed>;

/// Append `domain: message` to this thread's error buffer.
pub(crate) fn record(domain: &str, message: impl Display) -> Failed {
    ERROR_BUFFER.with(|buffer| {
        let _ = writeln!(buffer.borrow_mut(), "{domain}: {message}");
    });
    tracing::debug!(domain, %message, "engine call failed");
    Failed
}

pub(crate) fn ensure_running(domain: &str) -> Status<()> {
    if is_initialized() {
        Ok(())
    } else {
        Err(record(domain, "engine not initialized"))
    }
}

/// Run `work` inside the engine's worker pool.
pub(crate) fn run<R: Send>(work: impl FnOnce() -> R + Send) -> R {
    let pool = STATE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .pool
        .clone();
    match pool {
        Some(pool) => pool.install(work),
        None => work(),
    }
}
