//! Configuration for the session layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Choice;

/// Configuration for reauthentication behavior.
///
/// Sensible defaults are provided; override only the fields you care
/// about with struct update syntax:
///
/// ```rust
/// use std::time::Duration;
/// use dojo_session::SessionConfig;
///
/// let config = SessionConfig {
///     dialog_timeout: Some(Duration::from_secs(120)),
///     ..SessionConfig::default()
/// };
/// assert!(config.dialog_timeout.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a reauthentication dialog may stay unanswered.
    ///
    /// `None` (the default) waits for the user indefinitely. When set,
    /// the request that opened the dialog resolves it with
    /// [`timeout_choice`](Self::timeout_choice) once the time is up,
    /// which also releases every other waiter of that cycle.
    pub dialog_timeout: Option<Duration>,

    /// The choice applied when `dialog_timeout` elapses.
    ///
    /// Default: [`Choice::Logout`].
    pub timeout_choice: Choice,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dialog_timeout: None,
            timeout_choice: Choice::Logout,
        }
    }
}
