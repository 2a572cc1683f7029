//! Append-only block store for parchment.
//!
//! This crate provides:
//! - Segment-based block files (length-prefixed, rotated at a size bound)
//! - A redb index over the files: location by number, hash → number,
//!   transaction id → location, and the chain height
//! - Crash recovery by truncating unindexed tail bytes on open
//! - A per-ledger provider

mod blockfile;
mod error;
mod provider;
mod store;
mod tables;

pub use error::{BlockStoreError, Result};
pub use provider::BlockStoreProvider;
pub use store::BlockStore;
