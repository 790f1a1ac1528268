//! Deterministic encoding/decoding of row keys.
//!
//! ```text
//! writableRowKey := tableKey ':' HexBlockNum(bn) ':' primaryKey
//! abiRowKey      := HexName(account) ':' HexRevBlockNum(bn)
//! HexBlockNum(n) := lowercase 8-hex-digit big-endian of n
//! HexRevBlockNum(n) := HexBlockNum(0xFFFFFFFF - n)
//! ```

use std::fmt;

/// 32-bit block height. Monotonic.
pub type BlockNum = u32;

/// Bound used to cap the byte size of a single multi-get chunk. A payload
/// bound, not a concurrency bound.
pub const MULTI_GET_CHUNK_SIZE: usize = 5000;

/// Format `n` as a lowercase 8-hex-digit big-endian block number.
pub fn hex_block_num(n: BlockNum) -> String {
    format!("{n:08x}")
}

/// Parse an 8-hex-digit block number back into a `BlockNum`.
pub fn parse_hex_block_num(s: &str) -> Result<BlockNum, &'static str> {
    if s.len() != 8 {
        return Err("expected 8 hex digits for block number");
    }
    u32::from_str_radix(s, 16).map_err(|_| "invalid hex digits in block number")
}

/// Reverse-encoded block number: `0xFFFFFFFF - n`, so lexicographic ascending
/// string order corresponds to descending block order.
pub fn hex_rev_block_num(n: BlockNum) -> String {
    hex_block_num(u32::MAX - n)
}

/// Inverse of [`hex_rev_block_num`]. `hex_rev_block_num(hex_rev_block_num(n)) == n`.
pub fn parse_hex_rev_block_num(s: &str) -> Result<BlockNum, &'static str> {
    parse_hex_block_num(s).map(|rev| u32::MAX - rev)
}

/// An opaque string prefix identifying a logical tablet instance.
///
/// Family-specific formats:
/// - table-data: `<contract>:<scope>:<table>`
/// - key→accounts: `ka2:<publicKey>`
/// - auth links: `al:<account>`
/// - table-scopes: `ts:<account>:<table>`
/// - ABI: `<account>:`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey(String);

impl TableKey {
    pub fn new(raw: impl Into<String>) -> Self {
        TableKey(raw.into())
    }

    pub fn table_data(contract: &str, scope: &str, table: &str) -> Self {
        TableKey(format!("{contract}:{scope}:{table}"))
    }

    pub fn key_accounts(public_key: &str) -> Self {
        TableKey(format!("ka2:{public_key}"))
    }

    pub fn auth_links(account: &str) -> Self {
        TableKey(format!("al:{account}"))
    }

    pub fn table_scopes(account: &str, table: &str) -> Self {
        TableKey(format!("ts:{account}:{table}"))
    }

    pub fn abi(account: &str) -> Self {
        TableKey(format!("{account}:"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Row key for a given block number and primary key, forward-encoded
    /// (used by every tablet family except ABI).
    pub fn row_key(&self, bn: BlockNum, primary_key: &str) -> RowKey {
        RowKey(format!("{}:{}:{}", self.0, hex_block_num(bn), primary_key))
    }

    /// Half-open range `[firstRowKey, lastRowKey)` covering every delta row
    /// with `blockNum <= b`, optionally starting just past an index's
    /// `AtBlockNum`.
    pub fn delta_scan_range(&self, after_index_at: Option<BlockNum>, b: BlockNum) -> (String, String) {
        let first = match after_index_at {
            Some(at) => format!("{}:{}", self.0, hex_block_num(at + 1)),
            None => format!("{}:{}", self.0, hex_block_num(0)),
        };
        let last = format!("{}:{}", self.0, hex_block_num(b + 1));
        (first, last)
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-formed stored row key: `<tableKey>:<blockNumEncoded>:<primaryKeyEncoded>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(String);

impl RowKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already-formatted raw key string without validating its
    /// grammar. Used where a row key is known to come from the store
    /// verbatim (e.g. ABI rows, which don't fit the writable-row grammar).
    pub fn from_raw_unchecked(raw: &str) -> Self {
        RowKey(raw.to_string())
    }

    /// Parse `(tableKey, blockNum, primaryKey)` out of a stored writable row
    /// key. The primary key may itself contain `:` (e.g. encoded composite
    /// keys), so the block number is located by its fixed 8-hex-digit width
    /// from the second-to-last `:`-delimited segment counted from the tail.
    pub fn parse_writable(raw: &str) -> Result<(TableKey, BlockNum, String), &'static str> {
        // tableKey:HexBlockNum:primaryKey -- HexBlockNum is always 8 hex
        // chars, so find the `:HHHHHHHH:` marker from the left-most point
        // where it can occur after a tableKey.
        let bytes = raw.as_bytes();
        let mut idx = None;
        // Scan every position where a `:` is followed by 8 hex digits and
        // then another `:`; the table key is family-specific and may
        // contain `:` itself, so we take the *first* such marker, matching
        // the grammar where the table key never embeds an isolated 8-hex
        // run bounded by colons (block numbers are always emitted at a
        // fixed position immediately after the table key).
        for (i, b) in bytes.iter().enumerate() {
            if *b == b':' && raw.len() >= i + 10 && raw.as_bytes()[i + 9] == b':' {
                let candidate = &raw[i + 1..i + 9];
                if candidate.bytes().all(|c| c.is_ascii_hexdigit()) {
                    idx = Some(i);
                    break;
                }
            }
        }
        let colon = idx.ok_or("row key missing block-number segment")?;
        let table_key = &raw[..colon];
        let bn_str = &raw[colon + 1..colon + 9];
        let pk = &raw[colon + 10..];
        let bn = parse_hex_block_num(bn_str)?;
        Ok((TableKey::new(table_key), bn, pk.to_string()))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ABI row key: `HexName(account) ':' HexRevBlockNum(bn)`.
pub fn abi_row_key(account_hex_name: &str, bn: BlockNum) -> RowKey {
    RowKey(format!("{account_hex_name}:{}", hex_rev_block_num(bn)))
}

/// Parse the reverse block number out of an ABI row key's tail segment.
pub fn parse_abi_row_key_block_num(raw: &str) -> Result<BlockNum, &'static str> {
    let tail = raw.rsplit(':').next().ok_or("malformed ABI row key")?;
    parse_hex_rev_block_num(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_block_num_round_trips() {
        for n in [0u32, 1, 42, 0xdead_beef, u32::MAX] {
            let s = hex_block_num(n);
            assert_eq!(s.len(), 8);
            assert_eq!(parse_hex_block_num(&s).unwrap(), n);
        }
    }

    #[test]
    fn rev_block_num_round_trips_and_sorts_descending() {
        for n in [0u32, 1, 42, u32::MAX] {
            assert_eq!(parse_hex_rev_block_num(&hex_rev_block_num(n)).unwrap(), n);
        }
        // Descending block order must be ascending string order.
        assert!(hex_rev_block_num(11) < hex_rev_block_num(5));
    }

    #[test]
    fn table_key_formats_match_grammar() {
        assert_eq!(
            TableKey::table_data("0000000000000001", "0000000000000002", "0000000000000003")
                .as_str(),
            "0000000000000001:0000000000000002:0000000000000003"
        );
        assert_eq!(TableKey::key_accounts("PUB").as_str(), "ka2:PUB");
        assert_eq!(TableKey::auth_links("acct").as_str(), "al:acct");
        assert_eq!(TableKey::table_scopes("acct", "tbl").as_str(), "ts:acct:tbl");
        assert_eq!(TableKey::abi("acct").as_str(), "acct:");
    }

    #[test]
    fn row_key_parses_back() {
        let tk = TableKey::table_data("0000000000000001", "0000000000000002", "0000000000000003");
        let rk = tk.row_key(8, "0000000000000010");
        let (parsed_tk, bn, pk) = RowKey::parse_writable(rk.as_str()).unwrap();
        assert_eq!(parsed_tk, tk);
        assert_eq!(bn, 8);
        assert_eq!(pk, "0000000000000010");
    }

    #[test]
    fn abi_row_key_selects_max_block_le_b() {
        // S5: rows at bn=11 and bn=5; GetABI(B=7) should land on bn=5.
        let k11 = abi_row_key("acct", 11);
        let k5 = abi_row_key("acct", 5);
        assert!(k11.as_str() < k5.as_str());
        let first_key_at_b7 = abi_row_key("acct", 7);
        // first_key <= k5 <= k11 in ascending scan order; k5 is the first
        // key >= first_key_at_b7 among the two stored rows.
        assert!(first_key_at_b7.as_str() <= k5.as_str());
        assert!(k5.as_str() < k11.as_str());
    }
}
