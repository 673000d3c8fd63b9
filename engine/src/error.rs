use thiserror::Error;
use vestdrop_chain::ChainError;
use vestdrop_crypto::AddressError;

use crate::amounts::InvalidAmount;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("chain connection error: {0}")]
    Connection(#[from] ChainError),

    #[error("invalid amount for recipient {index}: {reason}")]
    InvalidAmount { index: usize, reason: InvalidAmount },

    #[error("invalid address {address:?} for recipient {index}: {source}")]
    InvalidAddress {
        index: usize,
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("invalid allocation list {path}: {reason}")]
    InvalidList { path: String, reason: String },

    #[error("persistence error on {path}: {reason}")]
    Persistence { path: String, reason: String },
}

impl EngineError {
    pub(crate) fn persistence(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
