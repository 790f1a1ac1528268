//! Index Cache (§4, step 1 of §4.1/§4.2): retrieves and holds the most
//! recent checkpoint index whose `AtBlockNum <= B` for a given table key.
//!
//! The cache is the only shared mutable state on the read path (§5) and
//! must be safe for concurrent readers; it is backed by an `lru::LruCache`
//! behind a `Mutex`, the same shape the teacher codebase reaches for when it
//! needs a small bounded cache in front of a columnar store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use lru::LruCache;

use crate::codec::{BlockNum, TableKey};
use crate::config::EngineConfig;
use crate::error::AdapterError;
use crate::kv::KvAdapter;

/// A materialized `primaryKey -> lastWriteBlock` snapshot at `at_block_num`,
/// authoritative over `[0, at_block_num]` (spec §3, invariant 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointIndex {
    pub at_block_num: BlockNum,
    /// primary key (encoded string) -> block number that last wrote it.
    pub map: BTreeMap<String, BlockNum>,
}

impl CheckpointIndex {
    pub fn new(at_block_num: BlockNum) -> Self {
        Self { at_block_num, map: BTreeMap::new() }
    }
}

/// Cache key: a table key paired with the query height it was resolved for.
/// Two different heights `B` can validly resolve to the same underlying
/// index, so we cache by `(table_key, at_block_num)` of the *resolved*
/// index, not by the query height itself — callers look up by query height
/// via [`IndexCache::get_for_block`], which may fall through to the adapter
/// on a miss but never needs to invalidate a hit (checkpoint indexes are
/// immutable once produced, spec §9 "checkpoint-index refresh").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct CacheKey {
    table_key: String,
    at_block_num: BlockNum,
}

/// Retrieves and caches checkpoint indexes. Tolerates a stale cache entry
/// whose `AtBlockNum` is older than the latest available index — that only
/// costs extra delta-scan work downstream, it never breaks correctness
/// (spec §9).
pub struct IndexCache<A: KvAdapter> {
    adapter: A,
    cache: Mutex<LruCache<CacheKey, CheckpointIndex>>,
}

impl<A: KvAdapter> IndexCache<A> {
    pub fn new(adapter: A, capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { adapter, cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Construct with the capacity named in `config.index_cache_capacity` —
    /// the entry point a node embedding this crate normally uses, the way
    /// the teacher's store opener takes a `StoreConfig` rather than loose
    /// tunables.
    pub fn with_config(adapter: A, config: &EngineConfig) -> Self {
        Self::new(adapter, config.index_cache_capacity)
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Resolve the highest-`AtBlockNum` index with `AtBlockNum <= b` for
    /// `table_key` (spec §4.1 step 1). Every lookup consults the adapter
    /// directly — the cache only avoids re-cloning a large index map it has
    /// already paid to deserialize for this exact `(table_key, at_block_num)`
    /// pair, which the adapter call below discovers.
    pub fn get_for_block(
        &self,
        table_key: &TableKey,
        b: BlockNum,
    ) -> Result<Option<CheckpointIndex>, AdapterError> {
        let resolved = self.adapter.fetch_index(table_key.as_str(), b)?;
        let Some(idx) = resolved else {
            return Ok(None);
        };
        let key = CacheKey { table_key: table_key.as_str().to_string(), at_block_num: idx.at_block_num };
        let mut cache = self.cache.lock().expect("index cache mutex poisoned");
        if let Some(cached) = cache.get(&key) {
            tracing::trace!(table_key = %table_key, at_block_num = idx.at_block_num, "checkpoint index cache hit");
            return Ok(Some(cached.clone()));
        }
        tracing::debug!(table_key = %table_key, at_block_num = idx.at_block_num, "checkpoint index cache miss, resolved from adapter");
        cache.put(key, idx.clone());
        Ok(Some(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryAdapter;

    #[test]
    fn caches_repeated_lookups_for_same_resolved_index() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::new("tk");
        let mut idx = CheckpointIndex::new(7);
        idx.map.insert("pk".into(), 5);
        adapter.put_index(tk.as_str(), idx.clone());

        let cache = IndexCache::new(adapter, 8);
        let first = cache.get_for_block(&tk, 10).unwrap().unwrap();
        let second = cache.get_for_block(&tk, 100).unwrap().unwrap();
        assert_eq!(first, idx);
        assert_eq!(second, idx);
    }

    #[test]
    fn with_config_uses_configured_capacity() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::new("tk");
        let mut idx = CheckpointIndex::new(7);
        idx.map.insert("pk".into(), 5);
        adapter.put_index(tk.as_str(), idx.clone());

        let cache = IndexCache::with_config(adapter, &EngineConfig::default());
        assert_eq!(cache.get_for_block(&tk, 10).unwrap().unwrap(), idx);
    }

    #[test]
    fn absent_index_is_none() {
        let adapter = MemoryAdapter::new();
        let cache = IndexCache::new(adapter, 8);
        assert!(cache.get_for_block(&TableKey::new("missing"), 10).unwrap().is_none());
    }
}
