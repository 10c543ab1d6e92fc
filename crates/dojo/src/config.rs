//! Client configuration.
//!
//! Plain structs with sensible defaults. Override only what you need, or
//! load the whole thing from JSON with [`ClientConfig::from_json`];
//! missing fields fall back to their defaults.

use std::path::PathBuf;

use dojo_protocol::{Codec, JsonCodec};
use dojo_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::DojoError;

// ---------------------------------------------------------------------------
// PolicyConfig
// ---------------------------------------------------------------------------

/// Which requests are exempt from the reauthentication flow.
///
/// Paths are matched against the request path without its query string.
/// A prefix matches itself and anything below it: `/events` covers
/// `/events` and `/events/12`, not `/eventsfeed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// The refresh-token endpoint. Always exempt, and used by the
    /// HTTP refresher.
    pub refresh_path: String,

    /// The login endpoint. Always exempt: a 401 here means a wrong
    /// password, not an expired session.
    pub login_path: String,

    /// Publicly readable listings. A tokenless `GET` below one of these
    /// is exempt.
    pub public_prefixes: Vec<String>,

    /// Registration-style writes. A tokenless write below one of these
    /// is exempt, so the page can show its own "please log in" prompt.
    pub registration_prefixes: Vec<String>,

    /// A request carrying this header is exempt whatever its path.
    pub skip_header: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/auth/refresh-token".into(),
            login_path: "/auth/login".into(),
            public_prefixes: vec![
                "/events".into(),
                "/articles".into(),
                "/blog".into(),
            ],
            registration_prefixes: vec!["/registrations".into()],
            skip_header: "x-skip-reauth".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything needed to build a [`DojoClient`](crate::DojoClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend API; request paths are relative to it.
    pub base_url: String,

    /// Where to persist the session. `None` keeps it in memory only.
    pub storage_path: Option<PathBuf>,

    /// Reauthentication behavior (dialog timeout).
    pub session: SessionConfig,

    /// Exempt-request rules.
    pub policy: PolicyConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".into(),
            storage_path: None,
            session: SessionConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses a JSON config document.
    ///
    /// # Errors
    /// [`DojoError::Protocol`] if the document is not valid JSON or a
    /// field has the wrong type.
    pub fn from_json(data: &[u8]) -> Result<Self, DojoError> {
        Ok(JsonCodec.decode(data)?)
    }
}
