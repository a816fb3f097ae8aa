//! Error types for overlay decoding and encoding.

use thiserror::Error;

/// Result type alias for overlay decoding.
pub type OverlayResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding a document into an overlay.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed structured input: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Expected a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("Incompatible value for typed schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Errors that can occur while encoding an overlay.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to serialize typed view: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Typed view encoded to {0}, expected a mapping")]
    NotAMapping(&'static str),
}
