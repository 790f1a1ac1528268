//! Tablet Query Layer (spec §4.3): one façade per tablet family, each
//! building a `tableKey`, driving the Reconstruction Engine, applying the
//! speculative overlay, decoding values into typed rows, and sorting the
//! final set.
//!
//! Per spec §9's design note, family-specific key decoders are modeled as a
//! lookup rather than inheritance: [`TabletFamily`] plays the role
//! `DBCol` plays in the teacher codebase's `columns.rs` — an enum
//! describing each column's key shape, dispatched through rather than
//! subclassed.

pub mod abi;
pub mod auth_links;
pub mod key_accounts;
pub mod table_data;
pub mod table_scopes;

use crate::codec::BlockNum;
use crate::names::Name;

/// Decoded table-data row (spec §3 `TableRow`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub key: u64,
    pub payer: u64,
    pub data: Vec<u8>,
    pub block_num: BlockNum,
}

/// Decoded auth-link row (spec §3 `LinkedPermission`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedPermission {
    pub contract: Name,
    pub action: Name,
    pub permission_name: Name,
    pub block_num: BlockNum,
}

/// Decoded ABI row (spec §3 `ABIRow`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiRow {
    pub account: Name,
    pub block_num: BlockNum,
    pub packed_abi: Vec<u8>,
}

/// A decoded account-name or scope result, sorted by its decoded display
/// string (spec §4.3 step 7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResult {
    pub name: Name,
    pub block_num: BlockNum,
}

/// Tablet families and their fixed-width index-primary-key byte layout
/// (spec §4.3: `indexPrimaryKeyByteCountByTableKey`). Byte count is the
/// number of big-endian u64 fields packed into the primary-key segment of a
/// secondary-index tablet's row key; `TableData` uses a single u64 key and
/// is listed here only for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabletFamily {
    TableData,
    KeyAccounts,
    AuthLinks,
    TableScopes,
    Abi,
}

impl TabletFamily {
    /// Number of big-endian `u64` fields packed into the primary-key
    /// segment for this family.
    pub const fn index_primary_key_field_count(&self) -> usize {
        match self {
            TabletFamily::TableData => 1,
            TabletFamily::KeyAccounts => 1, // account name
            TabletFamily::AuthLinks => 3,   // contract, action, permission_name
            TabletFamily::TableScopes => 1, // scope
            TabletFamily::Abi => 0,
        }
    }

    pub const fn index_primary_key_byte_count(&self) -> usize {
        self.index_primary_key_field_count() * 8
    }
}

/// Encode a sequence of `u64` fields into the fixed-width hex primary-key
/// segment used by secondary-index tablets.
pub fn encode_index_primary_key(fields: &[u64]) -> String {
    let mut buf = Vec::with_capacity(fields.len() * 8);
    for f in fields {
        buf.extend_from_slice(&f.to_be_bytes());
    }
    hex::encode(buf)
}

/// Decode the fixed-width hex primary-key segment back into its `u64`
/// fields for the given family.
pub fn decode_index_primary_key(
    family: TabletFamily,
    encoded: &str,
) -> Result<Vec<u64>, &'static str> {
    let want_bytes = family.index_primary_key_byte_count();
    let bytes = hex::decode(encoded).map_err(|_| "primary key is not valid hex")?;
    if bytes.len() != want_bytes {
        return Err("primary key byte count does not match family's fixed width");
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| u64::from_be_bytes(c.try_into().expect("chunk is 8 bytes")))
        .collect())
}
