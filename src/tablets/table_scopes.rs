//! Table-scopes façade: which scopes have ever held rows for a given
//! account/table, as of block `B`.

use std::collections::BTreeMap;

use crate::codec::{BlockNum, TableKey};
use crate::config::EngineConfig;
use crate::engine::{self, Sink};
use crate::error::{CorruptionError, EngineError};
use crate::index_cache::IndexCache;
use crate::kv::KvAdapter;
use crate::names::Name;
use crate::speculative::SpeculativeBatch;
use crate::tablets::{decode_index_primary_key, encode_index_primary_key, NamedResult, TabletFamily};

#[derive(Debug, Default)]
struct Accumulator(BTreeMap<String, NamedResult>);

impl Sink for Accumulator {
    type Error = CorruptionError;

    fn on_updated(&mut self, block_num: BlockNum, primary_key: &str, _value: &[u8]) -> Result<(), Self::Error> {
        let fields = decode_index_primary_key(TabletFamily::TableScopes, primary_key)
            .map_err(|reason| CorruptionError::KeyParse { raw: primary_key.to_string(), reason })?;
        self.0.insert(primary_key.to_string(), NamedResult { name: Name(fields[0]), block_num });
        Ok(())
    }

    fn on_deleted(&mut self, _block_num: BlockNum, primary_key: &str) -> Result<(), Self::Error> {
        self.0.remove(primary_key);
        Ok(())
    }
}

fn apply_overlay(acc: &mut BTreeMap<String, NamedResult>, account: &str, table: &str, batches: &[SpeculativeBatch]) {
    for batch in batches {
        for entry in &batch.table_scopes {
            if entry.account.to_hex() != account || entry.table.to_hex() != table {
                continue;
            }
            let pk = encode_index_primary_key(&[entry.scope.0]);
            if entry.deletion {
                acc.remove(&pk);
            } else {
                acc.insert(pk, NamedResult { name: entry.scope, block_num: batch.block_num });
            }
        }
    }
}

/// `ReadTableScopes(B, account, table, speculative_writes)`: ascending by
/// decoded name string.
pub fn read_table_scopes<A: KvAdapter>(
    index_cache: &IndexCache<A>,
    config: &EngineConfig,
    account: &str,
    table: &str,
    block_num: BlockNum,
    speculative_writes: &[SpeculativeBatch],
) -> Result<Vec<Name>, EngineError> {
    let table_key = TableKey::table_scopes(account, table);
    let mut acc = Accumulator::default();
    engine::read(index_cache, config, &table_key, block_num, &mut acc)?;
    apply_overlay(&mut acc.0, account, table, speculative_writes);

    let mut names: Vec<Name> = acc.0.into_values().map(|r| r.name).collect();
    names.sort_by_key(|n| n.decode_to_display());
    Ok(names)
}

/// `HasSeenTableOnce(account, table)`: true if any row has ever existed
/// under this account/table's prefix, historical not point-in-time.
pub fn has_seen_table_once<A: KvAdapter>(
    adapter: &A,
    account: &str,
    table: &str,
) -> Result<bool, crate::error::AdapterError> {
    adapter.has_tablet_row(TableKey::table_scopes(account, table).as_str())
}
