//! Block Marker (spec §4.6): the last-written-block marker, used for
//! "is next block" and shard-clean checks. Sharding coordination itself is
//! out of scope (spec §1); only the marker read/validate surface lives here.

use crate::codec::BlockNum;
use crate::error::BlockMarkerError;
use crate::kv::{BlockRef, KvAdapter};

const LAST_BLOCK_ROW_KEY: &str = "last-written-block";

/// The storage key for the last-written-block marker: a fixed constant
/// normally, or `shard-NNN` (zero-padded 3 digits) for a sharded node.
pub fn last_block_key(shard_index: Option<u32>) -> String {
    match shard_index {
        None => LAST_BLOCK_ROW_KEY.to_string(),
        Some(n) => format!("shard-{n:03}"),
    }
}

/// `FetchLastWrittenBlock`: returns the stored marker, or `BlockRef::ZERO`
/// if absent.
pub fn fetch_last_written_block<A: KvAdapter>(
    adapter: &A,
    shard_index: Option<u32>,
) -> Result<BlockRef, BlockMarkerError> {
    let key = last_block_key(shard_index);
    Ok(adapter.fetch_last_written_block(&key)?.unwrap_or(BlockRef::ZERO))
}

/// `CheckCleanDBForSharding`: reads the *non-shard* marker. Absence is OK
/// (the DB is clean to receive sharded reprocessing); presence is an error,
/// since it means this DB already has unsharded history written to it.
pub fn check_clean_db_for_sharding<A: KvAdapter>(adapter: &A) -> Result<(), BlockMarkerError> {
    let key = last_block_key(None);
    match adapter.fetch_last_written_block(&key)? {
        None => Ok(()),
        Some(marker) => Err(BlockMarkerError::MarkerPresent { present: marker.num }),
    }
}

/// `isNextBlock`: whether `write_block_num` is an acceptable next write
/// given the currently stored marker. Accepted when the marker equals
/// `write_block_num - 1`, or — per the bootstrap tolerance carried over
/// from the original implementation (spec §4.6, §9: "likely a
/// migration/bootstrap allowance") — when the stored marker value is `0` or
/// `1`. Any other gap is rejected.
pub fn is_next_block(marker: BlockNum, write_block_num: BlockNum) -> Result<(), BlockMarkerError> {
    if marker == 0 || marker == 1 {
        return Ok(());
    }
    if write_block_num == 0 || marker != write_block_num - 1 {
        tracing::warn!(marker, write_block_num, "rejecting out-of-order block write");
        return Err(BlockMarkerError::UnexpectedGap { marker, write_block_num });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryAdapter;

    #[test]
    fn last_block_key_is_constant_or_shard_prefixed() {
        assert_eq!(last_block_key(None), LAST_BLOCK_ROW_KEY);
        assert_eq!(last_block_key(Some(7)), "shard-007");
    }

    #[test]
    fn fetch_last_written_block_defaults_to_zero() {
        let adapter = MemoryAdapter::new();
        assert_eq!(fetch_last_written_block(&adapter, None).unwrap(), BlockRef::ZERO);
    }

    #[test]
    fn check_clean_db_rejects_present_marker() {
        let adapter = MemoryAdapter::new();
        adapter.put_marker(&last_block_key(None), BlockRef { num: 5, id: [1u8; 32] });
        let err = check_clean_db_for_sharding(&adapter).unwrap_err();
        assert!(matches!(err, BlockMarkerError::MarkerPresent { present: 5 }));
    }

    #[test]
    fn is_next_block_accepts_contiguous_and_bootstrap_values() {
        assert!(is_next_block(9, 10).is_ok());
        assert!(is_next_block(0, 50).is_ok());
        assert!(is_next_block(1, 50).is_ok());
        assert!(is_next_block(9, 11).is_err());
    }
}
