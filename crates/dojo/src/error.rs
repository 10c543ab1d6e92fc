//! Unified error type for the Dojo client.

use dojo_protocol::ProtocolError;
use dojo_session::{SessionError, StorageError};
use dojo_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `dojo` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DojoError {
    /// A transport-level error (network, HTTP status).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (dialog misuse).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A storage backend error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DojoError {
    /// The HTTP status behind this error, if there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Returns `true` if the backend rejected our credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_unauthorized())
    }
}
