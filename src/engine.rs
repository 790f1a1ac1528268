//! Reconstruction Engine (spec §4.1, §4.2): `read` and `read_single`.
//!
//! The engine drives two caller-supplied callbacks — bundled here as the
//! [`Sink`] trait, playing the role of the observer interface spec §9
//! recommends in place of the original's two free-standing closures — with
//! every `(blockNum, primaryKey, value)` event needed to rebuild a snapshot.
//! The engine itself holds no accumulator; applying events in delivery order
//! to an initially-empty map is the caller's job (spec §4.1 preamble).

use crate::codec::{BlockNum, RowKey, TableKey};
use crate::config::EngineConfig;
use crate::error::{CallbackError, CorruptionError, EngineError};
use crate::index_cache::IndexCache;
use crate::kv::{KvAdapter, StoredRow};

/// Caller-maintained accumulator interface. `on_updated` is invoked for a
/// live write, `on_deleted` for a tombstone. Implementations decode `value`
/// into a typed row and insert/remove it from their own accumulator map;
/// the engine does not interpret `value` beyond emptiness.
pub trait Sink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn on_updated(&mut self, block_num: BlockNum, primary_key: &str, value: &[u8]) -> Result<(), Self::Error>;
    fn on_deleted(&mut self, block_num: BlockNum, primary_key: &str) -> Result<(), Self::Error>;
}

fn wrap_callback_err<E: std::error::Error + Send + Sync + 'static>(key: &RowKey, err: E) -> EngineError {
    CallbackError::Failed { key: key.clone(), source: Box::new(err) }.into()
}

/// Replay one multi-get chunk of indexed keys (§4.1 step 2). A chunk that
/// resolves zero rows at all is a corruption error; every resolved row must
/// carry a non-empty value (the index never records deletions).
fn replay_index_chunk<A: KvAdapter, S: Sink>(
    adapter: &A,
    keys: &[RowKey],
    sink: &mut S,
) -> Result<(), EngineError> {
    let mut rows_seen = 0usize;
    let mut first_err: Option<EngineError> = None;

    adapter.fetch_tablet_rows(keys, &mut |row: StoredRow| {
        rows_seen += 1;
        if first_err.is_some() {
            return;
        }
        if row.value.is_empty() {
            tracing::warn!(key = %row.key, "indexed row carried an empty value");
            first_err = Some(CorruptionError::IndexedRowEmpty { key: row.key }.into());
            return;
        }
        let parsed = RowKey::parse_writable(row.key.as_str());
        let (_, bn, pk) = match parsed {
            Ok(v) => v,
            Err(reason) => {
                first_err =
                    Some(CorruptionError::KeyParse { raw: row.key.as_str().to_string(), reason }.into());
                return;
            }
        };
        if let Err(e) = sink.on_updated(bn, &pk, &row.value) {
            first_err = Some(wrap_callback_err(&row.key, e));
        }
    })?;

    if let Some(err) = first_err {
        return Err(err);
    }
    if rows_seen == 0 && !keys.is_empty() {
        tracing::warn!(first_key = %keys[0], chunk_size = keys.len(), "indexed chunk resolved no rows");
        return Err(CorruptionError::IndexedKeyMissing { key: keys[0].clone() }.into());
    }
    Ok(())
}

/// Ordered delta scan over `[first_key, last_key)` (§4.1 step 3, §4.2 step 4).
/// When `filter_pk` is set, rows for other primary keys are skipped.
fn scan_deltas<A: KvAdapter, S: Sink>(
    adapter: &A,
    first_key: &str,
    last_key: &str,
    filter_pk: Option<&str>,
    sink: &mut S,
) -> Result<(), EngineError> {
    let mut first_err: Option<EngineError> = None;

    adapter.scan_tablet_rows(first_key, last_key, &mut |row: StoredRow| {
        if first_err.is_some() {
            return;
        }
        let parsed = RowKey::parse_writable(row.key.as_str());
        let (_, bn, pk) = match parsed {
            Ok(v) => v,
            Err(reason) => {
                first_err =
                    Some(CorruptionError::KeyParse { raw: row.key.as_str().to_string(), reason }.into());
                return;
            }
        };
        if let Some(want) = filter_pk {
            if pk != want {
                return;
            }
        }
        let result = if row.value.is_empty() {
            sink.on_deleted(bn, &pk)
        } else {
            sink.on_updated(bn, &pk, &row.value)
        };
        if let Err(e) = result {
            first_err = Some(wrap_callback_err(&row.key, e));
        }
    })?;

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// `read(tableKey, B)` (§4.1): drives `sink` with every event needed to
/// rebuild the full-table snapshot at block `b`.
pub fn read<A: KvAdapter, S: Sink>(
    index_cache: &IndexCache<A>,
    config: &EngineConfig,
    table_key: &TableKey,
    b: BlockNum,
    sink: &mut S,
) -> Result<(), EngineError> {
    tracing::debug!(table_key = %table_key, block_num = b, "reconstructing table snapshot");
    let idx = index_cache.get_for_block(table_key, b)?;

    if let Some(idx) = &idx {
        let entries: Vec<(&String, &BlockNum)> = idx.map.iter().collect();
        for chunk in entries.chunks(config.multi_get_chunk_size.max(1)) {
            let keys: Vec<RowKey> = chunk.iter().map(|(pk, bn)| table_key.row_key(**bn, pk)).collect();
            replay_index_chunk(index_cache.adapter(), &keys, sink)?;
        }
    }

    let (first, last) = table_key.delta_scan_range(idx.as_ref().map(|i| i.at_block_num), b);
    scan_deltas(index_cache.adapter(), &first, &last, None, sink)
}

/// `readSingle(tableKey, pk, B)` (§4.2): same shape, optimized to one primary
/// key. When the resolved index is authoritative and excludes `pk`, this
/// signals [`EngineError::RowNotFound`] without a fallback delta scan — the
/// index covers `[0, AtBlockNum]` completely (spec §4.2 step 3 / edge case).
pub fn read_single<A: KvAdapter, S: Sink>(
    index_cache: &IndexCache<A>,
    table_key: &TableKey,
    pk: &str,
    b: BlockNum,
    sink: &mut S,
) -> Result<(), EngineError> {
    tracing::debug!(table_key = %table_key, primary_key = pk, block_num = b, "reconstructing single row");
    let idx = index_cache.get_for_block(table_key, b)?;

    if let Some(idx) = &idx {
        match idx.map.get(pk) {
            Some(&bn) => {
                let key = table_key.row_key(bn, pk);
                let row = index_cache.adapter().fetch_tablet_row(key.as_str())?;
                match row {
                    None => return Err(CorruptionError::IndexedKeyMissing { key }.into()),
                    Some(row) if row.value.is_empty() => {
                        return Err(CorruptionError::IndexedRowEmpty { key: row.key }.into());
                    }
                    Some(row) => {
                        sink.on_updated(bn, pk, &row.value).map_err(|e| wrap_callback_err(&row.key, e))?;
                    }
                }
            }
            None => return Err(EngineError::RowNotFound { at_block_num: idx.at_block_num }),
        }
    }

    let (first, last) = table_key.delta_scan_range(idx.as_ref().map(|i| i.at_block_num), b);
    scan_deltas(index_cache.adapter(), &first, &last, Some(pk), sink)
}
