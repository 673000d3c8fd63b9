use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("submission rejected: {0}")]
    Submission(String),
}
