//! Private data store error types.

use snafu::Snafu;

use parchment_types::ConfigError;

/// Private data store error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PvtDataStoreError {
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("Unexpected block number: expected {expected}, received {received}"))]
    UnexpectedBlockNumber { expected: u64, received: u64 },

    #[snafu(display("Commit called before a block-to-live policy was set"))]
    UninitializedPolicy,

    #[snafu(display("Cannot bootstrap the height of a non-empty store"))]
    NotEmpty,

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

/// Result type for private data store operations.
pub type Result<T> = std::result::Result<T, PvtDataStoreError>;
