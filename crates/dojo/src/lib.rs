//! # Dojo
//!
//! Authenticated API client for the martial-arts school site.
//!
//! Dojo keeps the signed-in user's tokens, attaches them to every API
//! call, and recovers when the backend says the session expired: the
//! user is asked once whether to refresh or log out, however many
//! requests failed at the same time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dojo::prelude::*;
//!
//! # async fn run() -> Result<(), DojoError> {
//! let client = DojoClient::builder()
//!     .base_url("https://dojo.example.com/api")
//!     .build()?;
//!
//! // Somewhere in the UI: answer the "session expired" dialog.
//! let coordinator = client.coordinator().clone();
//! tokio::spawn(async move {
//!     let mut status = coordinator.watch();
//!     while status.changed().await.is_ok() {
//!         if status.borrow_and_update().is_open() {
//!             let _ = coordinator.resolve(Choice::Refresh);
//!         }
//!     }
//! });
//!
//! client.login("student@dojo.test", "hunter2").await?;
//! let events = client.get("/events").await?;
//! # let _ = events;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod interceptor;
mod policy;
mod refresh;

pub use client::{DojoClient, DojoClientBuilder};
pub use config::{ClientConfig, PolicyConfig};
pub use error::DojoError;
pub use interceptor::AuthInterceptor;
pub use policy::{ExemptReason, RequestClass, RequestPolicy};
pub use refresh::HttpTokenRefresher;

/// Convenience re-exports for the common case.
///
/// ```rust
/// use dojo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AuthInterceptor, ClientConfig, DojoClient, DojoClientBuilder,
        DojoError, HttpTokenRefresher, PolicyConfig, RequestPolicy,
    };
    pub use dojo_protocol::{Role, UserProfile};
    pub use dojo_session::{
        Choice, DialogStatus, FileStorage, MemoryStorage, NullStorage,
        ReauthCoordinator, SessionConfig, SessionSnapshot, SessionStore,
        Storage, TokenRefresher,
    };
    pub use dojo_transport::{
        HttpRequest, HttpResponse, Method, Transport, TransportError,
    };
}
