//! Engine configuration, analogous to `StoreConfig` in the teacher codebase:
//! tunables a node embedding this crate may want to override, all with sane
//! defaults so a plain `EngineConfig::default()` is production-ready.

/// Tunables for the Reconstruction Engine and Index Cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of keys per multi-get chunk when replaying a
    /// checkpoint index (spec §4.1 step 2, §5). Bounds per-batch payload
    /// size, not concurrency.
    pub multi_get_chunk_size: usize,

    /// Number of `(table_key, AtBlockNum)` checkpoint indexes the Index
    /// Cache keeps resident before evicting the least-recently-used entry.
    pub index_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            multi_get_chunk_size: crate::codec::MULTI_GET_CHUNK_SIZE,
            index_cache_capacity: 1024,
        }
    }
}
