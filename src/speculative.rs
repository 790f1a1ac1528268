//! Speculative writes: caller-supplied, not-yet-committed mutations that
//! overlay the persisted snapshot for a single query. The core trusts the
//! caller's per-batch block ordering and applies later batches after earlier
//! ones — last-writer-wins, and deleting an absent primary key is a no-op.
//! Each tablet façade applies its own overlay directly against its
//! accumulator, since the fields relevant to "does this entry match the
//! request" and "what's the accumulator key" differ per family.

use crate::codec::BlockNum;
use crate::names::Name;

/// One per-block batch of speculative writes.
#[derive(Debug, Clone, Default)]
pub struct SpeculativeBatch {
    pub block_num: BlockNum,
    pub table_datas: Vec<SpecTableData>,
    pub key_accounts: Vec<SpecKeyAccount>,
    pub auth_links: Vec<SpecAuthLink>,
    pub table_scopes: Vec<SpecTableScope>,
    pub abis: Vec<SpecAbi>,
}

#[derive(Debug, Clone)]
pub struct SpecTableData {
    pub contract: Name,
    pub scope: Name,
    pub table: Name,
    pub primary_key: u64,
    pub payer: Name,
    pub data: Vec<u8>,
    pub deletion: bool,
}

#[derive(Debug, Clone)]
pub struct SpecKeyAccount {
    pub public_key: String,
    pub account: Name,
    pub deletion: bool,
}

#[derive(Debug, Clone)]
pub struct SpecAuthLink {
    pub account: Name,
    pub contract: Name,
    pub action: Name,
    pub permission_name: Name,
    pub deletion: bool,
}

#[derive(Debug, Clone)]
pub struct SpecTableScope {
    pub account: Name,
    pub table: Name,
    pub scope: Name,
    pub deletion: bool,
}

#[derive(Debug, Clone)]
pub struct SpecAbi {
    pub account: Name,
    pub packed_abi: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn s4_last_writer_wins_with_delete() {
        // Two batches touching the same key: an update then a delete.
        let batches = vec![
            SpeculativeBatch {
                block_num: 11,
                table_datas: vec![SpecTableData {
                    contract: Name(1),
                    scope: Name(2),
                    table: Name(3),
                    primary_key: 0x10,
                    payer: Name(7),
                    data: b"C".to_vec(),
                    deletion: false,
                }],
                ..Default::default()
            },
            SpeculativeBatch {
                block_num: 12,
                table_datas: vec![SpecTableData {
                    contract: Name(1),
                    scope: Name(2),
                    table: Name(3),
                    primary_key: 0x10,
                    payer: Name(7),
                    data: vec![],
                    deletion: true,
                }],
                ..Default::default()
            },
        ];

        let mut acc: BTreeMap<u64, (BlockNum, bool)> = BTreeMap::new();
        for batch in &batches {
            for entry in &batch.table_datas {
                if entry.deletion {
                    acc.remove(&entry.primary_key);
                } else {
                    acc.insert(entry.primary_key, (batch.block_num, true));
                }
            }
        }
        assert!(!acc.contains_key(&0x10));
    }
}
