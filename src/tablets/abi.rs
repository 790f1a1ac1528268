//! ABI retrieval (spec §4.4, §6.3 `GetABI`). Reverse-encoded block numbers
//! let a "latest ≤ B" query be answered with a single forward-direction
//! point read of a reverse scan's first result (spec §4.4 rationale).

use crate::codec::{hex_rev_block_num, parse_abi_row_key_block_num, BlockNum};
use crate::error::{AbiError, CorruptionError, EngineError};
use crate::kv::KvAdapter;
use crate::names::Name;
use crate::speculative::SpeculativeBatch;
use crate::tablets::AbiRow;

/// `GetABI(B, account, speculative)`.
pub fn get_abi<A: KvAdapter>(
    adapter: &A,
    account: Name,
    block_num: BlockNum,
    speculative_writes: &[SpeculativeBatch],
) -> Result<AbiRow, AbiError> {
    let prefix = format!("{}:", account.to_hex());
    let first_key = format!("{prefix}{}", hex_rev_block_num(block_num));
    let last_key = format!("{prefix}{}", hex_rev_block_num(0));

    let stored = adapter.fetch_abi(&prefix, &first_key, &last_key).map_err(|e| AbiError::Engine(e.into()))?;
    let mut out: Option<AbiRow> = match stored {
        Some(row) => {
            let abi_block_num = parse_abi_row_key_block_num(row.key.as_str()).map_err(|reason| {
                let corruption = CorruptionError::KeyParse { raw: row.key.as_str().to_string(), reason };
                AbiError::Engine(EngineError::from(corruption))
            })?;
            Some(AbiRow { account, block_num: abi_block_num, packed_abi: row.value })
        }
        None => None,
    };

    // Overlay: every matching speculative ABI replaces `out`, applied in
    // batch order so the last one wins (spec §4.4 step 4).
    for batch in speculative_writes {
        for entry in &batch.abis {
            if entry.account != account {
                continue;
            }
            out = Some(AbiRow {
                account,
                block_num: batch.block_num,
                packed_abi: entry.packed_abi.clone(),
            });
        }
    }

    match out {
        Some(row) if !row.packed_abi.is_empty() => Ok(row),
        _ => Err(AbiError::NotFound { at_block_num: block_num }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryAdapter;
    use crate::speculative::SpecAbi;

    #[test]
    fn s5_abi_reverse_scan_selects_max_block_le_b() {
        let adapter = MemoryAdapter::new();
        let account = Name::from_hex("0000000000000009").unwrap();
        adapter.put_row(
            &format!("{}:{}", account.to_hex(), crate::codec::hex_rev_block_num(11)),
            b"abi11".to_vec(),
        );
        adapter.put_row(
            &format!("{}:{}", account.to_hex(), crate::codec::hex_rev_block_num(5)),
            b"abi5".to_vec(),
        );

        let row = get_abi(&adapter, account, 7, &[]).unwrap();
        assert_eq!(row.block_num, 5);
        assert_eq!(row.packed_abi, b"abi5");
    }

    #[test]
    fn speculative_overlay_replaces_persisted_abi() {
        let adapter = MemoryAdapter::new();
        let account = Name::from_hex("0000000000000009").unwrap();
        adapter.put_row(
            &format!("{}:{}", account.to_hex(), crate::codec::hex_rev_block_num(5)),
            b"abi5".to_vec(),
        );

        let batches = vec![crate::speculative::SpeculativeBatch {
            block_num: 9,
            abis: vec![SpecAbi { account, packed_abi: b"speculative".to_vec() }],
            ..Default::default()
        }];
        let row = get_abi(&adapter, account, 9, &batches).unwrap();
        assert_eq!(row.block_num, 9);
        assert_eq!(row.packed_abi, b"speculative");
    }

    #[test]
    fn not_found_when_empty() {
        let adapter = MemoryAdapter::new();
        let account = Name::from_hex("0000000000000009").unwrap();
        let err = get_abi(&adapter, account, 7, &[]).unwrap_err();
        assert!(matches!(err, AbiError::NotFound { at_block_num: 7 }));
    }
}
