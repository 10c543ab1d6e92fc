//! Hook for minting a new access token from a refresh token.
//!
//! The session layer doesn't know where tokens come from. It defines the
//! [`TokenRefresher`] trait: one async method that takes the refresh token
//! and returns a fresh pair or the error that stopped it. The client crate
//! implements it over HTTP; tests implement it with canned answers.

use std::future::Future;
use std::sync::Arc;

use dojo_transport::TransportError;

/// A freshly minted credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    /// Always non-empty: a refresh with no usable access token is an error.
    pub access_token: String,
    /// `None` when the endpoint didn't rotate the refresh token.
    pub refresh_token: Option<String>,
}

/// Exchanges a refresh token for new credentials.
///
/// # Example
///
/// ```rust
/// use dojo_session::{RefreshedTokens, TokenRefresher};
/// use dojo_transport::TransportError;
///
/// /// Hands out a fixed token. Only useful in demos.
/// struct FixedRefresher;
///
/// impl TokenRefresher for FixedRefresher {
///     async fn refresh(
///         &self,
///         _refresh_token: &str,
///     ) -> Result<RefreshedTokens, TransportError> {
///         Ok(RefreshedTokens {
///             access_token: "fresh".into(),
///             refresh_token: None,
///         })
///     }
/// }
/// ```
pub trait TokenRefresher: Send + Sync + 'static {
    /// Calls the refresh endpoint.
    ///
    /// # Returns
    /// - `Ok(RefreshedTokens)` — a usable access token
    /// - `Err(TransportError)` — the endpoint rejected the refresh token,
    ///   was unreachable, or answered without a usable access token
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshedTokens, TransportError>> + Send;
}

impl<R: TokenRefresher> TokenRefresher for Arc<R> {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshedTokens, TransportError>> + Send {
        (**self).refresh(refresh_token)
    }
}
