//! In-memory `KvAdapter` used by this crate's own tests and by integrators
//! writing unit tests against the engine without standing up a real store —
//! the role `TestDB`/`create_test_store` plays for `core/store` in the
//! teacher codebase.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::codec::{BlockNum, RowKey};
use crate::error::AdapterError;
use crate::index_cache::CheckpointIndex;
use crate::kv::{BlockRef, KvAdapter, StoredRow};

#[derive(Default)]
struct Inner {
    rows: BTreeMap<String, Vec<u8>>,
    indexes: BTreeMap<String, Vec<CheckpointIndex>>,
    markers: BTreeMap<String, BlockRef>,
}

/// A `BTreeMap`-backed [`KvAdapter`]. Not optimized; exists purely so
/// callers can exercise the reconstruction engine and tablet façades without
/// an external store.
pub struct MemoryAdapter {
    inner: Mutex<Inner>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// Insert (or overwrite) a stored row directly by its raw key string.
    pub fn put_row(&self, key: &str, value: Vec<u8>) {
        self.inner.lock().unwrap().rows.insert(key.to_string(), value);
    }

    /// Register a checkpoint index for `table_key`. Multiple indexes at
    /// different `AtBlockNum` may be registered for the same table key.
    pub fn put_index(&self, table_key: &str, index: CheckpointIndex) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.indexes.entry(table_key.to_string()).or_default();
        list.push(index);
        list.sort_by_key(|i| i.at_block_num);
    }

    /// Set the block marker stored under `key`.
    pub fn put_marker(&self, key: &str, marker: BlockRef) {
        self.inner.lock().unwrap().markers.insert(key.to_string(), marker);
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl KvAdapter for MemoryAdapter {
    fn fetch_abi(
        &self,
        prefix: &str,
        first_key: &str,
        last_key: &str,
    ) -> Result<Option<StoredRow>, AdapterError> {
        let inner = self.inner.lock().unwrap();
        let hit = inner
            .rows
            .range(first_key.to_string()..last_key.to_string())
            .find(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| StoredRow { key: row_key_from_raw(k), value: v.clone() });
        Ok(hit)
    }

    fn fetch_tablet_row(&self, key: &str) -> Result<Option<StoredRow>, AdapterError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .get(key)
            .map(|v| StoredRow { key: row_key_from_raw(key), value: v.clone() }))
    }

    fn fetch_tablet_rows(
        &self,
        keys: &[RowKey],
        on_row: &mut dyn FnMut(StoredRow),
    ) -> Result<(), AdapterError> {
        let inner = self.inner.lock().unwrap();
        for key in keys {
            if let Some(v) = inner.rows.get(key.as_str()) {
                on_row(StoredRow { key: key.clone(), value: v.clone() });
            }
        }
        Ok(())
    }

    fn scan_tablet_rows(
        &self,
        first_key: &str,
        last_key: &str,
        on_row: &mut dyn FnMut(StoredRow),
    ) -> Result<(), AdapterError> {
        let inner = self.inner.lock().unwrap();
        for (k, v) in inner.rows.range(first_key.to_string()..last_key.to_string()) {
            on_row(StoredRow { key: row_key_from_raw(k), value: v.clone() });
        }
        Ok(())
    }

    fn has_tablet_row(&self, prefix: &str) -> Result<bool, AdapterError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.keys().any(|k| k.starts_with(prefix)))
    }

    fn fetch_last_written_block(&self, key: &str) -> Result<Option<BlockRef>, AdapterError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.markers.get(key).copied())
    }

    fn fetch_index(
        &self,
        table_key: &str,
        max_at_block_num: BlockNum,
    ) -> Result<Option<CheckpointIndex>, AdapterError> {
        let inner = self.inner.lock().unwrap();
        let hit = inner
            .indexes
            .get(table_key)
            .and_then(|list| list.iter().rev().find(|i| i.at_block_num <= max_at_block_num))
            .cloned();
        Ok(hit)
    }
}

fn row_key_from_raw(raw: &str) -> RowKey {
    // The memory adapter stores rows keyed by their already-formatted row
    // key string. Writable rows round-trip through the table-key grammar;
    // ABI rows don't fit it (the reverse block number sits in the tail
    // segment directly), so fall back to wrapping the raw string unchanged.
    RowKey::parse_writable(raw)
        .map(|(tk, bn, pk)| tk.row_key(bn, &pk))
        .unwrap_or_else(|_| RowKey::from_raw_unchecked(raw))
}
