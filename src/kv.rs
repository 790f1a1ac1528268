//! KV Adapter (§4, §6.1): the narrow interface this crate consumes from the
//! underlying ordered key-value store. The store itself — point get, range
//! scan, multi-get — is out of scope (spec §1); only this trait boundary is
//! specified here, the way `core/store`'s `Database` trait in the teacher
//! codebase sits between columnar callers and RocksDB.

use crate::codec::{BlockNum, RowKey};
use crate::error::AdapterError;
use crate::index_cache::CheckpointIndex;

pub mod memory;

/// A stored block reference (spec §3 `LastBlockMarker`): the block number
/// plus its 32-byte block id. A not-found marker is represented by the
/// caller as `BlockRef::ZERO`, never by this type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub num: BlockNum,
    pub id: [u8; 32],
}

impl BlockRef {
    pub const ZERO: BlockRef = BlockRef { num: 0, id: [0u8; 32] };
}

/// One stored row as delivered by a range scan or multi-get: its full row
/// key and raw value. An empty `value` denotes a tombstone (spec §3).
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub key: RowKey,
    pub value: Vec<u8>,
}

/// Narrow interface over the backing ordered key-value store (§6.1).
///
/// Implementors serve each multi-get chunk and each range scan serially —
/// from the *caller's* point of view per row — though they are free to
/// parallelize fetching internally (§5). Every operation may block on
/// network I/O; cancellation is expected to surface as
/// [`AdapterError::Cancelled`].
pub trait KvAdapter {
    /// `FetchABI`: reverse range scan over `[firstKey, lastKey)` rooted at
    /// `prefix`, returning the first row (i.e. greatest block ≤ B). Absence
    /// is tolerated and represented as `Ok(None)`.
    fn fetch_abi(
        &self,
        prefix: &str,
        first_key: &str,
        last_key: &str,
    ) -> Result<Option<StoredRow>, AdapterError>;

    /// `FetchTabletRow`: point get of a single row.
    fn fetch_tablet_row(&self, key: &str) -> Result<Option<StoredRow>, AdapterError>;

    /// `FetchTabletRows`: multi-get of up to
    /// [`crate::codec::MULTI_GET_CHUNK_SIZE`] keys, invoking `on_row` for
    /// every key that resolves to a stored row. Keys with no stored row are
    /// silently skipped; the engine decides whether that is an error.
    fn fetch_tablet_rows(
        &self,
        keys: &[RowKey],
        on_row: &mut dyn FnMut(StoredRow),
    ) -> Result<(), AdapterError>;

    /// `ScanTabletRows`: ordered half-open range scan `[first_key, last_key)`,
    /// invoking `on_row` for each row in ascending key order.
    fn scan_tablet_rows(
        &self,
        first_key: &str,
        last_key: &str,
        on_row: &mut dyn FnMut(StoredRow),
    ) -> Result<(), AdapterError>;

    /// `HasTabletRow`: prefix-existence probe. True if any row has ever
    /// existed under `prefix` (historical, not point-in-time; spec §4.5).
    fn has_tablet_row(&self, prefix: &str) -> Result<bool, AdapterError>;

    /// `FetchLastWrittenBlock`: read the block-marker row at `key`.
    fn fetch_last_written_block(&self, key: &str) -> Result<Option<BlockRef>, AdapterError>;

    /// Retrieve the checkpoint index for `table_key` with the greatest
    /// `AtBlockNum <= max_at_block_num`, if one exists. Backs the Index
    /// Cache (§4.1 step 1); not part of the row-key grammar in §6.2 since
    /// checkpoint indexes are a write-pipeline artifact, out of scope for
    /// this crate beyond their retrieval shape.
    fn fetch_index(
        &self,
        table_key: &str,
        max_at_block_num: BlockNum,
    ) -> Result<Option<CheckpointIndex>, AdapterError>;
}
