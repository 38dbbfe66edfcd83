//! Keyed memoization of cleaned datasets.
//!
//! The key is a hash of the raw input bytes together with every setting
//! that affects validation and cleaning. Analysis settings are not part of
//! the key, so a cached dataset can be re-analysed with different grouping
//! or bin widths.
//!
//! The cache is process-local and unbounded: entries live until
//! [`CleaningCache::clear`] is called or the cache is dropped. The input
//! length is stored next to the hash so that two inputs of different size
//! never share an entry.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::CleanedDataset;
use crate::utils::stable_hash_with;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Identifies one cleaned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Hash of the input bytes and the cleaning settings.
    pub hash: u64,
    /// Length of the input in bytes.
    pub input_len: usize,
}

/// Thread-safe cache of cleaned datasets.
#[derive(Debug, Default)]
pub struct CleaningCache {
    entries: Mutex<HashMap<CacheKey, Arc<CleanedDataset>>>,
}

static_assertions::assert_impl_all!(CleaningCache: Send, Sync);

impl CleaningCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for `raw` cleaned under `config`.
    pub fn key_for(raw: &[u8], config: &PipelineConfig) -> CacheKey {
        let hash = stable_hash_with(|hasher| {
            raw.hash(hasher);
            for value in [
                config.max_dimension_mm,
                config.small_stone_carat,
                config.max_small_stone_height_mm,
                config.max_depth_deviation,
            ] {
                value.to_bits().hash(hasher);
            }
            config.enforce_grade_enumerations.hash(hasher);
        });
        CacheKey {
            hash,
            input_len: raw.len(),
        }
    }

    pub fn get(&self, key: CacheKey) -> Option<Arc<CleanedDataset>> {
        self.entries.lock().get(&key).cloned()
    }

    /// Store `cleaned` under `key`, returning the shared handle. An entry
    /// that is already present wins.
    pub fn insert(&self, key: CacheKey, cleaned: CleanedDataset) -> Arc<CleanedDataset> {
        self.entries
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(cleaned))
            .clone()
    }

    /// Return the cached entry for `key`, or compute and store it.
    ///
    /// The lock is not held while `compute` runs. Errors are not cached.
    pub fn get_or_try_insert_with<F>(&self, key: CacheKey, compute: F) -> Result<Arc<CleanedDataset>>
    where
        F: FnOnce() -> Result<CleanedDataset>,
    {
        if let Some(hit) = self.get(key) {
            debug!("Cleaning cache hit ({:016x})", key.hash);
            return Ok(hit);
        }
        debug!("Cleaning cache miss ({:016x})", key.hash);
        Ok(self.insert(key, compute()?))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
