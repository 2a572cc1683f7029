//! Per-transaction validation codes and the flag vector stored in block metadata.

use serde::{Deserialize, Serialize};

/// Outcome of validating a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxValidationCode {
    /// Transaction passed validation.
    Valid,
    /// Transaction has not been validated yet.
    NotValidated,
    /// The private write set did not match its on-chain hash.
    InvalidWriteset,
    /// A key read by the transaction was updated by an earlier transaction.
    MvccReadConflict,
    /// The transaction payload could not be decoded.
    BadPayload,
}

/// Per-transaction validation flags, one code per transaction in block order.
///
/// Validity is an annotation on the block, not a filter: private data for
/// invalid transactions is stored and returned like any other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxValidationFlags(Vec<TxValidationCode>);

impl TxValidationFlags {
    /// Create flags for `len` transactions, all marked [`TxValidationCode::Valid`].
    pub fn new(len: usize) -> Self {
        Self(vec![TxValidationCode::Valid; len])
    }

    /// Set the code for the transaction at `tx_index`.
    ///
    /// Out-of-range indices are ignored.
    pub fn set_flag(&mut self, tx_index: usize, code: TxValidationCode) {
        if let Some(slot) = self.0.get_mut(tx_index) {
            *slot = code;
        }
    }

    /// Code for the transaction at `tx_index`.
    ///
    /// Returns [`TxValidationCode::NotValidated`] for out-of-range indices.
    pub fn flag(&self, tx_index: usize) -> TxValidationCode {
        self.0.get(tx_index).copied().unwrap_or(TxValidationCode::NotValidated)
    }

    /// Whether the transaction at `tx_index` is marked valid.
    pub fn is_valid(&self, tx_index: usize) -> bool {
        self.flag(tx_index) == TxValidationCode::Valid
    }

    /// Number of flags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the flag vector is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
