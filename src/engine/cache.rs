//! Process-wide memo of operation results.
//!
//! Keys combine the operation name, the identity of the input (the image id,
//! or a SHA-256 of the source bytes for loaders) and the `Debug` rendering of
//! the argument record. Entries are evicted least-recently-used once any of
//! the three limits is exceeded: entry count, resident pixel bytes, or number
//! of file-sourced loads.

use super::raw::RawImage;
use super::Status;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

struct Entry {
    image: Arc<RawImage>,
    last_used: u64,
    bytes: usize,
    from_file: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    tick: u64,
    memory: usize,
    files: usize,
    max_ops: usize,
    max_files: usize,
    max_memory: usize,
}

impl CacheState {
    fn over_limit(&self) -> bool {
        self.entries.len() > self.max_ops
            || self.memory > self.max_memory
            || self.files > self.max_files
    }

    fn trim(&mut self) {
        while self.over_limit() {
            let files_only = self.files > self.max_files;
            let oldest = self
                .entries
                .iter()
                .filter(|(_, entry)| !files_only || entry.from_file)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else { break };
            self.remove(&key);
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.memory -= entry.bytes;
            if entry.from_file {
                self.files -= 1;
            }
        }
    }
}

pub(crate) struct OperationCache {
    state: Mutex<CacheState>,
}

static CACHE: LazyLock<OperationCache> = LazyLock::new(|| OperationCache {
    state: Mutex::new(CacheState {
        max_ops: super::DEFAULT_CACHE_MAX,
        max_files: super::DEFAULT_CACHE_MAX_FILES,
        max_memory: super::DEFAULT_CACHE_MAX_MEMORY,
        ..CacheState::default()
    }),
});

pub(crate) fn global() -> &'static OperationCache {
    &CACHE
}

impl OperationCache {
    pub(crate) fn set_limits(&self, max_ops: usize, max_files: usize, max_memory: usize) {
        let mut state = self.lock();
        state.max_ops = max_ops;
        state.max_files = max_files;
        state.max_memory = max_memory;
        state.trim();
    }

    pub(crate) fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.memory = 0;
        state.files = 0;
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<RawImage>> {
        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;
        state.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.image)
        })
    }

    pub(crate) fn insert(&self, key: String, image: Arc<RawImage>, from_file: bool) {
        let mut state = self.lock();
        state.remove(&key);
        state.tick += 1;
        let bytes = image.byte_len();
        state.memory += bytes;
        if from_file {
            state.files += 1;
        }
        let last_used = state.tick;
        state.entries.insert(
            key,
            Entry {
                image,
                last_used,
                bytes,
                from_file,
            },
        );
        state.trim();
    }

    #[cfg(test)]
    fn stats(&self) -> (usize, usize, usize) {
        let state = self.lock();
        (state.entries.len(), state.memory, state.files)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Key for an operation applied to an existing image.
pub(crate) fn operation_key(op: &str, input: &RawImage, args: &impl Debug) -> String {
    format!("{op}:{}:{args:?}", input.id())
}

/// Key for a load from an in-memory buffer.
pub(crate) fn content_key(op: &str, bytes: &[u8], args: &impl Debug) -> String {
    let digest = Sha256::digest(bytes);
    format!("{op}:{:x}:{args:?}", digest)
}

/// Return the cached result for `key`, or compute and remember it.
pub(crate) fn memoize(
    key: String,
    from_file: bool,
    compute: impl FnOnce() -> Status<RawImage>,
) -> Status<Arc<RawImage>> {
    let cache = global();
    if let Some(hit) = cache.get(&key) {
        tracing::trace!(%key, "cache hit");
        return Ok(hit);
    }
    let image = Arc::new(compute()?);
    cache.insert(key, Arc::clone(&image), from_file);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Interpretation;

    fn local(max_ops: usize, max_files: usize, max_memory: usize) -> OperationCache {
        OperationCache {
            state: Mutex::new(CacheState {
                max_ops,
                max_files,
                max_memory,
                ..CacheState::default()
            }),
        }
    }

    fn image(bytes: usize) -> Arc<RawImage> {
        Arc::new(RawImage::new_uchar(
            bytes as u32,
            1,
            1,
            Interpretation::BW,
            vec![0; bytes],
        ))
    }

    #[test]
    fn evicts_least_recently_used_beyond_max_ops() {
        let cache = local(2, 10, 1_000);
        cache.insert("a".into(), image(1), false);
        cache.insert("b".into(), image(1), false);
        cache.get("a");
        cache.insert("c".into(), image(1), false);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn memory_limit_bounds_resident_bytes() {
        let cache = local(100, 10, 10);
        cache.insert("a".into(), image(6), false);
        cache.insert("b".into(), image(6), false);

        let (entries, memory, _) = cache.stats();
        assert_eq!(entries, 1);
        assert_eq!(memory, 6);
    }

    #[test]
    fn file_limit_counts_only_file_loads() {
        let cache = local(100, 1, 1_000);
        cache.insert("buffer".into(), image(1), false);
        cache.insert("file-a".into(), image(1), true);
        cache.insert("file-b".into(), image(1), true);

        assert!(cache.get("buffer").is_some());
        assert!(cache.get("file-a").is_none());
        assert_eq!(cache.stats().2, 1);
    }

    #[test]
    fn content_key_depends_on_bytes_and_args() {
        let a = content_key("load", b"abc", &1);
        let b = content_key("load", b"abd", &1);
        let c = content_key("load", b"abc", &2);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, content_key("load", b"abc", &1));
    }

    #[test]
    fn lowering_limits_trims_immediately() {
        let cache = local(10, 10, 1_000);
        for key in ["a", "b", "c"] {
            cache.insert(key.into(), image(1), false);
        }
        cache.set_limits(1, 10, 1_000);
        assert_eq!(cache.stats().0, 1);
        assert!(cache.get("c").is_some());
    }
}
