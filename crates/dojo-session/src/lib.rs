//! Session state and reauthentication for Dojo.
//!
//! This crate holds the pieces that decide what the signed-in user looks
//! like and what happens when the backend stops accepting their token:
//!
//! 1. **Session store** ([`SessionStore`]) — the current access/refresh
//!    tokens and user profile, persisted through a [`Storage`] backend
//! 2. **Reauthentication** ([`ReauthCoordinator`]) — asks the user at most
//!    once per burst of rejected requests and broadcasts their [`Choice`]
//! 3. **Token refresh** ([`TokenRefresher`] trait) — how a refresh token
//!    becomes a new access token
//!
//! # How it fits in the stack
//!
//! ```text
//! Client layer (above)  ← intercepts requests, drives the coordinator
//!     ↕
//! Session layer (this crate)  ← tokens, profile, dialog state
//!     ↕
//! Protocol / Transport (below)  ← wire types, HTTP errors
//! ```

mod config;
mod coordinator;
mod error;
mod refresher;
mod storage;
mod store;

pub use config::SessionConfig;
pub use coordinator::{ChoiceStream, Choice, DialogStatus, ReauthCoordinator};
pub use error::{SessionError, StorageError};
pub use refresher::{RefreshedTokens, TokenRefresher};
pub use storage::{FileStorage, MemoryStorage, NullStorage, Storage};
pub use store::{
    ACCESS_TOKEN_KEY, Credentials, REFRESH_TOKEN_KEY, SessionSnapshot,
    SessionStore, USER_KEY,
};
