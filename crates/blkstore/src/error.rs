//! Block store error types.

use snafu::Snafu;

use parchment_types::{ConfigError, Hash};

/// Block store error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BlockStoreError {
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("Block not found at height {height}"))]
    BlockNotFound { height: u64 },

    #[snafu(display("No block with hash {hash:02x?}"))]
    BlockHashNotFound { hash: Hash },

    #[snafu(display("No transaction with id {tx_id}"))]
    TxNotFound { tx_id: String },

    #[snafu(display("Unexpected block number: expected {expected}, received {received}"))]
    UnexpectedBlockNumber { expected: u64, received: u64 },

    #[snafu(display("Serialization error: {message}"))]
    Serialization { message: String },

    #[snafu(display("Invalid configuration: {source}"))]
    Config { source: ConfigError },

    #[snafu(display("Database error: {source}"))]
    Database { source: redb::DatabaseError },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: redb::StorageError },

    #[snafu(display("Table error: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Transaction error: {source}"))]
    Transaction { source: redb::TransactionError },

    #[snafu(display("Commit error: {source}"))]
    Commit { source: redb::CommitError },
}

/// Result type for block store operations.
pub type Result<T> = std::result::Result<T, BlockStoreError>;
