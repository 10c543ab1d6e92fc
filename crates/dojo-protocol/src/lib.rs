//! Wire protocol for Dojo's session endpoints.
//!
//! This crate defines what the client and the backend exchange when a
//! user logs in or refreshes a session:
//!
//! - **Types** ([`TokenResponse`], [`UserProfile`], [`Role`], requests) —
//!   the JSON bodies of the auth endpoints.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those values are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! The protocol layer knows nothing about transports or session state.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{LoginRequest, RefreshRequest, Role, TokenResponse, UserProfile};
