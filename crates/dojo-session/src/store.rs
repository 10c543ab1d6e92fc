//! The session store: the signed-in user's credentials and profile.
//!
//! This is the only shared mutable state in the session layer. It is
//! changed in exactly two ways, [`SessionStore::set_credentials`] and
//! [`SessionStore::clear`] (plus [`SessionStore::set_profile`] for the
//! cached user), and every change is mirrored to a [`Storage`] backend and
//! announced to subscribers.
//!
//! # Concurrency note
//!
//! Reads and writes go through one `parking_lot::RwLock` that is never
//! held across an `.await`. A writer updates both tokens and writes them
//! to storage while holding the lock, so no reader can observe a new
//! access token paired with an old refresh token.

use std::sync::Arc;

use dojo_protocol::{Codec, JsonCodec, Role, UserProfile};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::{NullStorage, Storage};

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the cached user profile (JSON).
pub const USER_KEY: &str = "user";

/// The access/refresh token pair.
///
/// A refresh token may exist without an access token (the access token
/// expired and was dropped); usually both are present or both absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// What subscribers learn on every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// An access token is present.
    pub authenticated: bool,
    /// The cached user's role, `Guest` when there is none.
    pub role: Role,
}

#[derive(Debug, Default)]
struct SessionState {
    credentials: Credentials,
    profile: Option<UserProfile>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.credentials.access_token.is_some(),
            role: self.profile.as_ref().map(|p| p.role).unwrap_or_default(),
        }
    }
}

/// Holds the current credentials and user profile.
///
/// Create one per process with [`SessionStore::open`] and share it behind
/// an `Arc` with the interceptor and the UI.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: RwLock<SessionState>,
    changes: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Opens a store over `storage`, rehydrating whatever it holds.
    ///
    /// Rehydration happens here, before the store is handed out, so the
    /// first read after a restart already sees the persisted values.
    /// Unreadable entries are logged and treated as absent.
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key, %error, "failed to read session storage");
                None
            }
        };

        let credentials = Credentials {
            access_token: read(ACCESS_TOKEN_KEY),
            refresh_token: read(REFRESH_TOKEN_KEY),
        };
        let profile = read(USER_KEY).and_then(|raw| {
            JsonCodec
                .decode::<UserProfile>(raw.as_bytes())
                .inspect_err(|error| {
                    tracing::warn!(%error, "discarding unreadable cached profile");
                })
                .ok()
        });

        let state = SessionState {
            credentials,
            profile,
        };
        tracing::debug!(
            authenticated = state.credentials.access_token.is_some(),
            persistent = storage.is_persistent(),
            "session store opened"
        );

        let (changes, _) = watch::channel(state.snapshot());
        Self {
            storage,
            state: RwLock::new(state),
            changes,
        }
    }

    /// A store that keeps everything in memory and persists nothing.
    pub fn ephemeral() -> Self {
        Self::open(Arc::new(NullStorage))
    }

    /// The current access token.
    pub fn access_token(&self) -> Option<String> {
        self.state.read().credentials.access_token.clone()
    }

    /// The current refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().credentials.refresh_token.clone()
    }

    /// Both tokens, read together.
    pub fn credentials(&self) -> Credentials {
        self.state.read().credentials.clone()
    }

    /// The cached user profile, if any.
    pub fn profile(&self) -> Option<UserProfile> {
        self.state.read().profile.clone()
    }

    /// The cached user's role; `Guest` when nobody is signed in.
    pub fn role(&self) -> Role {
        self.state.read().snapshot().role
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().credentials.access_token.is_some()
    }

    /// Stores a new token pair.
    ///
    /// `refresh_token: None` removes any stored refresh token; callers
    /// that want to keep the old one pass it back in.
    pub fn set_credentials(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) {
        let access_token = access_token.into();
        let snapshot = {
            let mut state = self.state.write();
            self.persist(ACCESS_TOKEN_KEY, Some(access_token.as_str()));
            self.persist(REFRESH_TOKEN_KEY, refresh_token.as_deref());
            state.credentials = Credentials {
                access_token: Some(access_token),
                refresh_token,
            };
            state.snapshot()
        };
        tracing::debug!("session credentials stored");
        self.changes.send_replace(snapshot);
    }

    /// Caches the signed-in user's profile.
    pub fn set_profile(&self, profile: UserProfile) {
        let snapshot = {
            let mut state = self.state.write();
            match JsonCodec.encode(&profile) {
                Ok(bytes) => {
                    let json = String::from_utf8_lossy(&bytes);
                    self.persist(USER_KEY, Some(&*json));
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to encode profile, keeping it in memory only");
                }
            }
            state.profile = Some(profile);
            state.snapshot()
        };
        self.changes.send_replace(snapshot);
    }

    /// Replaces the whole session after a login.
    ///
    /// Unlike [`set_credentials`](Self::set_credentials), any cached
    /// profile belongs to the previous user and is dropped when `profile`
    /// is `None`. Subscribers see a single change.
    pub fn sign_in(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        profile: Option<UserProfile>,
    ) {
        let access_token = access_token.into();
        let snapshot = {
            let mut state = self.state.write();
            self.persist(ACCESS_TOKEN_KEY, Some(access_token.as_str()));
            self.persist(REFRESH_TOKEN_KEY, refresh_token.as_deref());
            let encoded = profile.as_ref().map(|p| JsonCodec.encode(p)).transpose();
            match encoded {
                Ok(Some(bytes)) => {
                    let json = String::from_utf8_lossy(&bytes);
                    self.persist(USER_KEY, Some(&*json));
                }
                Ok(None) => self.persist(USER_KEY, None),
                Err(error) => {
                    tracing::warn!(%error, "failed to encode profile, keeping it in memory only");
                    self.persist(USER_KEY, None);
                }
            }
            state.credentials = Credentials {
                access_token: Some(access_token),
                refresh_token,
            };
            state.profile = profile;
            state.snapshot()
        };
        tracing::debug!(role = %snapshot.role, "signed in");
        self.changes.send_replace(snapshot);
    }

    /// Removes both credentials and the cached profile.
    ///
    /// Clearing an already-empty store does nothing.
    pub fn clear(&self) {
        let snapshot = {
            let mut state = self.state.write();
            if state.credentials.is_empty() && state.profile.is_none() {
                return;
            }
            self.persist(ACCESS_TOKEN_KEY, None);
            self.persist(REFRESH_TOKEN_KEY, None);
            self.persist(USER_KEY, None);
            *state = SessionState::default();
            state.snapshot()
        };
        tracing::info!("session cleared");
        self.changes.send_replace(snapshot);
    }

    /// Subscribes to change notifications.
    ///
    /// The receiver starts with the current snapshot marked as seen; use
    /// `changed().await` to wait for the next mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    /// Mirrors one key to storage. Failures are logged, never returned:
    /// the in-memory value stays authoritative.
    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(error) = result {
            tracing::warn!(key, %error, "session storage write failed, keeping in-memory value");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print tokens.
        f.debug_struct("SessionStore")
            .field("snapshot", &self.state.read().snapshot())
            .finish_non_exhaustive()
    }
}
