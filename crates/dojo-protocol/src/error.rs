//! Error types for the protocol layer.
//!
//! Each crate in Dojo defines its own error enum. A `ProtocolError` means
//! the problem is in turning values into bytes or back, not in networking
//! or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// backend that answered with an HTML error page.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded but violates the protocol, e.g. a token
    /// response whose access token is empty.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
