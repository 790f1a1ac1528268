//! Error taxonomy for the read path.
//!
//! Mirrors the way `node_storage/opener.rs` in the teacher codebase lays out
//! its `StoreOpenerError`: one variant per distinct failure mode, each
//! carrying the context (key, range, column) needed to log or alert on it
//! without re-deriving it from a wrapped string.

use crate::codec::{BlockNum, RowKey};

/// Failures raised by the KV Adapter boundary (§6.1), wrapped with the
/// operation and key range that was being served when the adapter failed.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("adapter operation {op} on key {key:?} failed: {source}")]
    Op { op: &'static str, key: String, #[source] source: Box<dyn std::error::Error + Send + Sync> },

    #[error("adapter range scan {op} over [{first}, {last}) failed: {source}")]
    Range {
        op: &'static str,
        first: String,
        last: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("operation cancelled")]
    Cancelled,
}

/// Structural/corruption errors (§7): a checkpoint index or delta row
/// violates one of the invariants in spec §3. These are fatal to the
/// request and should be logged and alerted on, never retried.
#[derive(Debug, thiserror::Error)]
pub enum CorruptionError {
    #[error("indexed key {key} yielded no row in its multi-get chunk")]
    IndexedKeyMissing { key: RowKey },

    #[error("indexed row {key} carried an empty value (index never records deletions)")]
    IndexedRowEmpty { key: RowKey },

    #[error("row key {raw:?} failed to parse: {reason}")]
    KeyParse { raw: String, reason: &'static str },

    #[error(
        "table-data value for {key} has length {len} < 8 (payer prefix) and is not a tombstone"
    )]
    ShortTableDataValue { key: RowKey, len: usize },
}

/// Errors surfaced by the caller-supplied accumulator callbacks (`on_update`
/// / `on_delete`), wrapped with the offending row key so the engine can
/// report exactly which event broke the decode.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("callback failed while applying row {key}: {source}")]
    Failed { key: RowKey, #[source] source: Box<dyn std::error::Error + Send + Sync> },
}

/// Top-level error returned by the Reconstruction Engine (§4.1, §4.2) and by
/// the tablet façades built on top of it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Corruption(#[from] CorruptionError),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    /// `readSingle` resolved an index that is authoritative over
    /// `[0, AtBlockNum]` and excludes the requested primary key (§4.2 step 3).
    #[error("row not found: primary key excluded by checkpoint index at or below block {at_block_num}")]
    RowNotFound { at_block_num: BlockNum },
}

/// Errors surfaced by ABI retrieval (§4.4).
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no ABI found for account at or below block {at_block_num}")]
    NotFound { at_block_num: BlockNum },
}

/// Errors surfaced by the block-marker operations (§4.6).
#[derive(Debug, thiserror::Error)]
pub enum BlockMarkerError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("marker present (at block {present}), expected none")]
    MarkerPresent { present: BlockNum },

    #[error("unexpected block gap: marker at {marker}, write targets block {write_block_num}")]
    UnexpectedGap { marker: BlockNum, write_block_num: BlockNum },
}
