//! Engine lifecycle, in its own test binary.
//!
//! Engine state is process-wide and this test shuts it down, so everything
//! runs in one sequential test function.

use dualscale::engine::{self, EngineConfig, EngineError, Interpretation};
use dualscale::imaging::ops;

#[test]
fn lifecycle_init_configure_shutdown() {
    // Configure before initialize is rejected and explained in the buffer.
    assert!(!engine::is_initialized());
    assert_eq!(
        engine::configure(EngineConfig::default()),
        Err(EngineError::Configure)
    );
    let buffer = engine::error_buffer().unwrap();
    assert!(buffer.contains("not initialized"), "{buffer}");
    // Reading clears it.
    assert_eq!(engine::error_buffer(), None);

    // Initialize is idempotent.
    engine::initialize().unwrap();
    engine::initialize().unwrap();
    assert!(engine::is_initialized());

    // Configure may be repeated; each call replaces the globals.
    engine::configure(EngineConfig {
        concurrency: 1,
        cache_max: 10,
        cache_max_files: 2,
        cache_max_memory: 1024 * 1024,
    })
    .unwrap();
    assert_eq!(engine::current_config().cache_max, 10);
    engine::configure(EngineConfig {
        cache_max: 20,
        ..Default::default()
    })
    .unwrap();
    let config = engine::current_config();
    assert_eq!(config.cache_max, 20);
    assert_eq!(config.cache_max_files, engine::DEFAULT_CACHE_MAX_FILES);

    // Operations work while running.
    let image = ops::decode_memory(vec![128; 8 * 8 * 3], 8, 8, 3, Interpretation::Srgb).unwrap();
    let cropped = ops::crop(&image, 0, 0, 4, 4).unwrap();
    assert_eq!(cropped.dimensions().width, 4);

    // Thread cleanup drops buffered text but keeps the engine running.
    assert!(ops::crop(&image, 6, 6, 4, 4).is_err());
    engine::thread_cleanup();
    assert_eq!(engine::error_buffer(), None);
    assert!(engine::is_initialized());

    // Shutdown is idempotent and later primitives fail.
    engine::shutdown();
    engine::shutdown();
    assert!(!engine::is_initialized());
    assert_eq!(ops::crop(&image, 0, 0, 4, 4).unwrap_err(), EngineError::Crop);
    assert!(engine::error_buffer().unwrap().contains("not initialized"));

    // Handles made before shutdown are still released normally.
    cropped.release();
    image.release();

    // And the engine can come back.
    engine::initialize().unwrap();
    assert!(engine::is_initialized());
    engine::shutdown();
}
