//! Error types for RelayKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type for RelayKV operations
#[derive(Debug, Error)]
pub enum RelayError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("Truncated {field}: expected {needed} bytes, got {available}")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Unknown {direction} kind: 0x{kind:02x}")]
    UnknownKind { direction: &'static str, kind: u8 },

    #[error("Unexpected {0} trailing bytes after payload")]
    TrailingBytes(usize),

    // -------------------------------------------------------------------------
    // Encode Errors
    // -------------------------------------------------------------------------
    #[error("Field {field} too long: {len} bytes (max 65535)")]
    FieldTooLong { field: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Identity must not be empty")]
    InvalidIdentity,

    #[error("Cannot start session at {addr}: {source}")]
    Startup {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// True for malformed, truncated, or unknown-kind input.
    ///
    /// These are recovered locally by discarding the message.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            RelayError::Truncated { .. }
                | RelayError::UnknownKind { .. }
                | RelayError::TrailingBytes(_)
        )
    }
}
