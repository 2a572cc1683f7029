//! Ledger storage coordinator for parchment.
//!
//! A permissioned ledger peer persists each block in two places: the public
//! block store and the private data store. The two are independent
//! files-on-disk components with no shared transaction, so this crate
//! provides the coordination between them:
//! - a commit protocol that writes the private data store first and treats
//!   "private data store one block ahead" as a legal, recoverable state
//! - recovery and height reconciliation on open
//! - read paths that join blocks with their (optionally filtered) private
//!   data
//! - bootstrap of a fresh private data store over an existing chain
//!
//! [`Provider`] opens per-ledger [`Store`]s; a [`Store`] serializes commits
//! and supports concurrent readers.

mod error;
mod provider;
mod store;

pub use error::{Result, StorageError};
pub use provider::Provider;
pub use store::Store;
