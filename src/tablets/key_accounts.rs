//! Key→accounts façade: which accounts have ever authorized with a given
//! public key, as of block `B`.

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
        let fields = decode_index_primary_key(TabletFamily::KeyAccounts, primary_key)
            .map_err(|reason| CorruptionError::KeyParse { raw: primary_key.to_string(), reason })?;
        self.0.insert(primary_key.to_string(), NamedResult { name: Name(fields[0]), block_num });
        Ok(())
    }

    fn on_deleted(&mut self, _block_num: BlockNum, primary_key: &str) -> Result<(), Self::Error> {
        self.0.remove(primary_key);
        Ok(())
    }
}

fn apply_overlay(acc: &mut BTreeMap<String, NamedResult>, public_key: &str, batches: &[SpeculativeBatch]) {
    for batch in batches {
        for entry in &batch.key_accounts {
            if entry.public_key != public_key {
                continue;
            }
            let pk = encode_index_primary_key(&[entry.account.0]);
            if entry.deletion {
                acc.remove(&pk);
            } else {
                acc.insert(pk, NamedResult { name: entry.account, block_num: batch.block_num });
            }
        }
    }
}

/// `ReadKeyAccounts(B, publicKey, speculative_writes)`: ascending by decoded
/// name string.
pub fn read_key_accounts<A: KvAdapter>(
    index_cache: &IndexCache<A>,
    config: &EngineConfig,
    public_key: &str,
    block_num: BlockNum,
    speculative_writes: &[SpeculativeBatch],
) -> Result<Vec<Name>, EngineError> {
    let table_key = TableKey::key_accounts(public_key);
    let mut acc = Accumulator::default();
    engine::read(index_cache, config, &table_key, block_num, &mut acc)?;
    apply_overlay(&mut acc.0, public_key, speculative_writes);

    let mut names: Vec<Name> = acc.0.into_values().map(|r| r.name).collect();
    names.sort_by_key(|n| n.decode_to_display());
    Ok(names)
}

/// `HasSeenPublicKeyOnce(pk)`: true if any row has ever existed under this
/// public key's prefix, historical not point-in-time.
pub fn has_seen_public_key_once<A: KvAdapter>(adapter: &A, public_key: &str) -> Result<bool, crate::error::AdapterError> {
    adapter.has_tablet_row(TableKey::key_accounts(public_key).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryAdapter;

    #[test]
    fn reads_sorted_by_decoded_name() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::key_accounts("PUBKEY");
        adapter.put_row(
            tk.row_key(5, &encode_index_primary_key(&[2])).as_str(),
            vec![1],
        );
        adapter.put_row(
            tk.row_key(5, &encode_index_primary_key(&[1])).as_str(),
            vec![1],
        );

        let cache = IndexCache::new(adapter, 8);
        let config = EngineConfig::default();
        let names = read_key_accounts(&cache, &config, "PUBKEY", 10, &[]).unwrap();
        assert_eq!(names.len(), 2);
    }
}
