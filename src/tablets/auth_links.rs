//! Auth-links façade: which contract/action pairs an account has linked to
//! which permission, as of block `B`.

use std::collections::BTreeMap;

use crate::codec::{BlockNum, TableKey};
use crate::config::EngineConfig;
use crate::engine::{self, Sink};
use crate::error::{CorruptionError, EngineError};
use crate::index_cache::IndexCache;
use crate::kv::KvAdapter;
use crate::names::Name;
use crate::speculative::SpeculativeBatch;
use crate::tablets::{decode_index_primary_key, encode_index_primary_key, LinkedPermission, TabletFamily};

#[derive(Debug, Default)]
struct Accumulator(BTreeMap<String, LinkedPermission>);

impl Sink for Accumulator {
    type Error = CorruptionError;

    fn on_updated(&mut self, block_num: BlockNum, primary_key: &str, _value: &[u8]) -> Result<(), Self::Error> {
        let fields = decode_index_primary_key(TabletFamily::AuthLinks, primary_key)
            .map_err(|reason| CorruptionError::KeyParse { raw: primary_key.to_string(), reason })?;
        self.0.insert(
            primary_key.to_string(),
            LinkedPermission {
                contract: Name(fields[0]),
                action: Name(fields[1]),
                permission_name: Name(fields[2]),
                block_num,
            },
        );
        Ok(())
    }

    fn on_deleted(&mut self, _block_num: BlockNum, primary_key: &str) -> Result<(), Self::Error> {
        self.0.remove(primary_key);
        Ok(())
    }
}

fn apply_overlay(acc: &mut BTreeMap<String, LinkedPermission>, account: &str, batches: &[SpeculativeBatch]) {
    for batch in batches {
        for entry in &batch.auth_links {
            if entry.account.to_hex() != account {
                continue;
            }
            let pk = encode_index_primary_key(&[entry.contract.0, entry.action.0, entry.permission_name.0]);
            if entry.deletion {
                acc.remove(&pk);
            } else {
                acc.insert(
                    pk,
                    LinkedPermission {
                        contract: entry.contract,
                        action: entry.action,
                        permission_name: entry.permission_name,
                        block_num: batch.block_num,
                    },
                );
            }
        }
    }
}

/// `ReadLinkedPermissions(B, account, speculative_writes)`: ascending by
/// `(contract, action)`.
pub fn read_linked_permissions<A: KvAdapter>(
    index_cache: &IndexCache<A>,
    config: &EngineConfig,
    account: &str,
    block_num: BlockNum,
    speculative_writes: &[SpeculativeBatch],
) -> Result<Vec<LinkedPermission>, EngineError> {
    let table_key = TableKey::auth_links(account);
    let mut acc = Accumulator::default();
    engine::read(index_cache, config, &table_key, block_num, &mut acc)?;
    apply_overlay(&mut acc.0, account, speculative_writes);

    let mut rows: Vec<LinkedPermission> = acc.0.into_values().collect();
    rows.sort_by_key(|r| (r.contract.0, r.action.0));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryAdapter;

    #[test]
    fn sorts_by_contract_then_action() {
        let adapter = MemoryAdapter::new();
        let tk = TableKey::auth_links("acct");
        adapter.put_row(tk.row_key(5, &encode_index_primary_key(&[2, 1, 9])).as_str(), vec![1]);
        adapter.put_row(tk.row_key(5, &encode_index_primary_key(&[1, 5, 9])).as_str(), vec![1]);

        let cache = IndexCache::new(adapter, 8);
        let config = EngineConfig::default();
        let rows = read_linked_permissions(&cache, &config, "acct", 10, &[]).unwrap();
        assert_eq!(rows[0].contract.0, 1);
        assert_eq!(rows[1].contract.0, 2);
    }
}
