//! Error types for the session layer.

use dojo_protocol::ProtocolError;

/// Errors that can occur in the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `resolve` was called while no reauthentication dialog was open
    /// (or after the dialog for that cycle was already resolved).
    ///
    /// This is a defect in the caller, not a runtime condition: each open
    /// cycle must be resolved exactly once.
    #[error("no reauthentication dialog is open")]
    DialogNotOpen,
}

/// Errors raised by a [`Storage`](crate::Storage) backend.
///
/// The [`SessionStore`](crate::SessionStore) never surfaces these: it logs
/// them and keeps serving from memory. They matter to code that opens a
/// backend directly, e.g. to decide whether to fall back to
/// [`NullStorage`](crate::NullStorage).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document isn't a valid key/value map.
    #[error("storage document is corrupt: {0}")]
    Corrupt(#[from] ProtocolError),
}
