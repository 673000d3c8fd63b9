//! Error type for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("invalid block hash: {0:?}")]
    InvalidBlockHash(String),
}
