//! Data model for parchment ledger storage.
//!
//! This crate provides:
//! - Block, transaction, and validation-flag types
//! - Private data write sets and missing-data bookkeeping
//! - The namespace/collection filter applied to private data reads
//! - SHA-256 hashing with fixed-layout header encoding
//! - Store configuration with validation

mod block;
pub mod config;
mod filter;
pub mod hash;
mod pvtdata;
mod validation;

pub use block::{Block, BlockHeader, BlockMetadata, BlockchainInfo, Transaction};
pub use config::{BlockStoreConfig, ConfigError, PvtDataConfig};
pub use filter::PvtNsCollFilter;
pub use hash::{Hash, ZERO_HASH};
pub use pvtdata::{
    BlockAndPvtData, CollectionPvtData, MissingCollection, MissingPvtData, MissingPvtDataInfo,
    NsPvtData, TxMissingPvtDataMap, TxPvtData, TxPvtDataMap, TxPvtWriteSet,
};
pub use validation::{TxValidationCode, TxValidationFlags};
