use thiserror::Error;

/// Errors surfaced by a `Store` implementation. Handlers translate these
/// into HTTP/gRPC status codes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metric type is not supported")]
    UnsupportedKind,

    #[error("metric is not found")]
    NotFound,

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to read key file: {0}")]
    KeyRead(#[from] std::io::Error),

    #[error("failed to parse PEM block")]
    InvalidPem,

    #[error("failed to parse key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),
}
