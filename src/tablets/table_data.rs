//! Generic table-data façade: `read_table` and `read_table_row`.

use std::collections::BTreeMap;

use crate::codec::{BlockNum, RowKey, TableKey};
use crate::config::EngineConfig;
use crate::engine::{self, Sink};
use crate::error::{AbiError, CorruptionError, EngineError};
use crate::index_cache::IndexCache;
use crate::kv::KvAdapter;
use crate::names::Name;
use crate::speculative::SpeculativeBatch;
use crate::tablets::abi;
use crate::tablets::{AbiRow, TableRow};

/// Errors surfaced by the table-data façade: either the reconstruction
/// engine or the ABI retrieval it wires in alongside the rows (spec §4.3
/// step 5, §6.3).
#[derive(Debug, thiserror::Error)]
pub enum TableReadError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Abi(#[from] AbiError),
}

#[derive(Debug, Clone)]
pub struct ReadTableRequest {
    pub contract: String,
    pub scope: String,
    pub table: String,
    pub block_num: BlockNum,
    pub speculative_writes: Vec<SpeculativeBatch>,
}

#[derive(Debug, Clone)]
pub struct ReadTableRowRequest {
    pub contract: String,
    pub scope: String,
    pub table: String,
    pub primary_key: u64,
    pub block_num: BlockNum,
    pub speculative_writes: Vec<SpeculativeBatch>,
}

/// `ReadTableRequest` → `{ABI, Rows[]}` (spec §6.3).
#[derive(Debug, Clone)]
pub struct ReadTableResponse {
    pub abi: AbiRow,
    pub rows: Vec<TableRow>,
}

/// `ReadTableRowRequest` → `{ABI, Row?}` (spec §6.3).
#[derive(Debug, Clone)]
pub struct ReadTableRowResponse {
    pub abi: AbiRow,
    pub row: Option<TableRow>,
}

#[derive(Debug, Clone, Default)]
struct Accumulator(BTreeMap<String, TableRow>);

/// Parse a request's `contract` identity field (already the 16-hex-digit
/// blockchain name form) into the `Name` `GetABI` (spec §4.4) expects.
fn account_name(contract: &str) -> Result<Name, EngineError> {
    Name::from_hex(contract)
        .map_err(|reason| CorruptionError::KeyParse { raw: contract.to_string(), reason }.into())
}

/// Payer decoding: `payer = be_u64(value[0:8])`, `data = value[8:]`. A
/// non-tombstone value shorter than 8 bytes is a structural error.
fn decode_value(primary_key: &str, block_num: BlockNum, value: &[u8]) -> Result<TableRow, CorruptionError> {
    if value.len() < 8 {
        return Err(CorruptionError::ShortTableDataValue {
            key: RowKey::from_raw_unchecked(primary_key),
            len: value.len(),
        });
    }
    let payer = u64::from_be_bytes(value[0..8].try_into().expect("checked length"));
    let data = value[8..].to_vec();
    let key = u64::from_str_radix(primary_key, 16).map_err(|_| CorruptionError::KeyParse {
        raw: primary_key.to_string(),
        reason: "primary key is not a hex u64",
    })?;
    Ok(TableRow { key, payer, data, block_num })
}

impl Sink for Accumulator {
    type Error = CorruptionError;

    fn on_updated(&mut self, block_num: BlockNum, primary_key: &str, value: &[u8]) -> Result<(), Self::Error> {
        let row = decode_value(primary_key, block_num, value)?;
        self.0.insert(primary_key.to_string(), row);
        Ok(())
    }

    fn on_deleted(&mut self, _block_num: BlockNum, primary_key: &str) -> Result<(), Self::Error> {
        self.0.remove(primary_key);
        Ok(())
    }
}

fn apply_speculative_overlay(
    acc: &mut BTreeMap<String, TableRow>,
    req_contract: &str,
    req_scope: &str,
    req_table: &str,
    batches: &[SpeculativeBatch],
    only_primary_key: Option<u64>,
) {
    for batch in batches {
        for entry in &batch.table_datas {
            if entry.contract.to_hex() != hex_name(req_contract)
                || entry.scope.to_hex() != hex_name(req_scope)
                || entry.table.to_hex() != hex_name(req_table)
            {
                continue;
            }
            if let Some(want) = only_primary_key {
                if entry.primary_key != want {
                    continue;
                }
            }
            let pk_str = format!("{:016x}", entry.primary_key);
            if entry.deletion {
                acc.remove(&pk_str);
            } else {
                acc.insert(
                    pk_str,
                    TableRow {
                        key: entry.primary_key,
                        payer: entry.payer.0,
                        data: entry.data.clone(),
                        block_num: batch.block_num,
                    },
                );
            }
        }
    }
}

fn hex_name(maybe_hex: &str) -> String {
    // Request identity fields are already the 16-hex-digit blockchain name
    // form used by TableKey.
    maybe_hex.to_string()
}

fn sorted_rows(acc: BTreeMap<String, TableRow>) -> Vec<TableRow> {
    let mut rows: Vec<TableRow> = acc.into_values().collect();
    rows.sort_by_key(|r| r.key);
    rows
}

pub fn read_table<A: KvAdapter>(
    index_cache: &IndexCache<A>,
    config: &EngineConfig,
    req: &ReadTableRequest,
) -> Result<ReadTableResponse, TableReadError> {
    let table_key = TableKey::table_data(&req.contract, &req.scope, &req.table);
    let mut acc = Accumulator::default();
    engine::read(index_cache, config, &table_key, req.block_num, &mut acc)?;
    apply_speculative_overlay(&mut acc.0, &req.contract, &req.scope, &req.table, &req.speculative_writes, None);
    let rows = sorted_rows(acc.0);

    let account = account_name(&req.contract)?;
    let abi = abi::get_abi(index_cache.adapter(), account, req.block_num, &req.speculative_writes)?;

    Ok(ReadTableResponse { abi, rows })
}

pub fn read_table_row<A: KvAdapter>(
    index_cache: &IndexCache<A>,
    req: &ReadTableRowRequest,
) -> Result<ReadTableRowResponse, TableReadError> {
    let table_key = TableKey::table_data(&req.contract, &req.scope, &req.table);
    let pk_str = format!("{:016x}", req.primary_key);
    let mut acc = Accumulator::default();
    let result = engine::read_single(index_cache, &table_key, &pk_str, req.block_num, &mut acc);
    match result {
        Ok(()) => {}
        Err(EngineError::RowNotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }
    apply_speculative_overlay(
        &mut acc.0,
        &req.contract,
        &req.scope,
        &req.table,
        &req.speculative_writes,
        Some(req.primary_key),
    );
    let row = acc.0.remove(&pk_str);

    let account = account_name(&req.contract)?;
    let abi = abi::get_abi(index_cache.adapter(), account, req.block_num, &req.speculative_writes)?;

    Ok(ReadTableRowResponse { abi, row })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_cache::IndexCache;
    use crate::kv::memory::MemoryAdapter;

    fn mk_value(payer: u64, data: &[u8]) -> Vec<u8> {
        [payer.to_be_bytes().to_vec(), data.to_vec()].concat()
    }

    /// Stash a trivial ABI row for `contract` so `get_abi` resolves; the ABI
    /// component of the response is exercised separately in
    /// `src/tablets/abi.rs`, so these table-data tests just need it present.
    fn put_abi(adapter: &MemoryAdapter, contract: &str) {
        adapter.put_row(
            &format!("{contract}:{}", crate::codec::hex_rev_block_num(1)),
            b"abi".to_vec(),
        );
    }

    #[test]
    fn reads_sorted_by_key() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::table_data("0000000000000001", "0000000000000002", "0000000000000003");
        adapter.put_row(tk.row_key(5, "0000000000000020").as_str(), mk_value(7, b"B"));
        adapter.put_row(tk.row_key(5, "0000000000000010").as_str(), mk_value(7, b"A"));
        put_abi(&adapter, "0000000000000001");

        let cache = IndexCache::new(adapter, 8);
        let config = EngineConfig::default();
        let req = ReadTableRequest {
            contract: "0000000000000001".into(),
            scope: "0000000000000002".into(),
            table: "0000000000000003".into(),
            block_num: 10,
            speculative_writes: vec![],
        };
        let resp = read_table(&cache, &config, &req).unwrap();
        assert_eq!(resp.rows.iter().map(|r| r.key).collect::<Vec<_>>(), vec![0x10, 0x20]);
    }

    #[test]
    fn speculative_delete_overlay_removes_persisted_row() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::table_data("0000000000000001", "0000000000000002", "0000000000000003");
        adapter.put_row(tk.row_key(5, "0000000000000010").as_str(), mk_value(7, b"A"));
        adapter.put_row(tk.row_key(8, "0000000000000010").as_str(), mk_value(7, b"B"));
        put_abi(&adapter, "0000000000000001");

        let cache = IndexCache::new(adapter, 8);
        let config = EngineConfig::default();
        let req = ReadTableRequest {
            contract: "0000000000000001".into(),
            scope: "0000000000000002".into(),
            table: "0000000000000003".into(),
            block_num: 12,
            speculative_writes: vec![SpeculativeBatch {
                block_num: 12,
                table_datas: vec![crate::speculative::SpecTableData {
                    contract: crate::names::Name::from_hex("0000000000000001").unwrap(),
                    scope: crate::names::Name::from_hex("0000000000000002").unwrap(),
                    table: crate::names::Name::from_hex("0000000000000003").unwrap(),
                    primary_key: 0x10,
                    payer: crate::names::Name(7),
                    data: vec![],
                    deletion: true,
                }],
                ..Default::default()
            }],
        };
        let resp = read_table(&cache, &config, &req).unwrap();
        assert!(resp.rows.is_empty());
    }

    #[test]
    fn short_value_is_structural_error() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::table_data("0000000000000001", "0000000000000002", "0000000000000003");
        adapter.put_row(tk.row_key(5, "0000000000000010").as_str(), vec![1, 2, 3]);

        let cache = IndexCache::new(adapter, 8);
        let config = EngineConfig::default();
        let req = ReadTableRequest {
            contract: "0000000000000001".into(),
            scope: "0000000000000002".into(),
            table: "0000000000000003".into(),
            block_num: 10,
            speculative_writes: vec![],
        };
        let err = read_table(&cache, &config, &req).unwrap_err();
        assert!(matches!(err, TableReadError::Engine(EngineError::Callback(_))));
    }

    #[test]
    fn read_table_row_carries_abi_alongside_the_row() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::table_data("0000000000000001", "0000000000000002", "0000000000000003");
        adapter.put_row(tk.row_key(5, "0000000000000010").as_str(), mk_value(7, b"A"));
        put_abi(&adapter, "0000000000000001");

        let cache = IndexCache::new(adapter, 8);
        let req = ReadTableRowRequest {
            contract: "0000000000000001".into(),
            scope: "0000000000000002".into(),
            table: "0000000000000003".into(),
            primary_key: 0x10,
            block_num: 10,
            speculative_writes: vec![],
        };
        let resp = read_table_row(&cache, &req).unwrap();
        assert_eq!(resp.row.unwrap().key, 0x10);
        assert_eq!(resp.abi.packed_abi, b"abi");
    }
}
