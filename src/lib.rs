//! Read path of a temporal, blockchain-state indexing database.
//!
//! Given a block height `B` and a logical table identity, reconstructs the
//! exact set of rows that were live at `B`, optionally overlaid with
//! caller-supplied speculative writes. The core is the versioned
//! row-reconstruction engine in [`engine`]: it combines a periodically
//! maintained checkpoint index ([`index_cache`]) with a forward scan of
//! per-row delta entries ([`kv`]) and an in-memory speculative overlay
//! ([`speculative`]). [`tablets`] wraps that engine with the typed query
//! surface for each supported secondary-index family.
//!
//! The underlying ordered key-value store, the write/ingestion pipeline,
//! RPC/HTTP serving, and sharding coordination are out of scope — this
//! crate only specifies the [`kv::KvAdapter`] boundary it consumes.

pub mod block_marker;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod index_cache;
pub mod kv;
pub mod names;
pub mod speculative;
pub mod tablets;

pub use codec::{BlockNum, TableKey};
pub use config::EngineConfig;
pub use index_cache::{CheckpointIndex, IndexCache};
pub use kv::{BlockRef, KvAdapter, StoredRow};
pub use names::Name;
