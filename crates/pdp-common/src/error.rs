//! Error types shared across PDP crates

use thiserror::Error;

/// Result type alias for PDP operations
pub type Result<T> = std::result::Result<T, PdpError>;

/// Main error type for shared PDP utilities
#[derive(Error, Debug)]
pub enum PdpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
