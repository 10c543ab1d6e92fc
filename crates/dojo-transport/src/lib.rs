//! Transport abstraction layer for Dojo.
//!
//! Provides the [`Transport`] trait that the session layer sends requests
//! through, plus the [`HttpRequest`] / [`HttpResponse`] values it carries.
//!
//! # Feature Flags
//!
//! - `reqwest` (default) — HTTP transport via `reqwest`

mod error;
#[cfg(feature = "reqwest")]
mod http;
mod request;

pub use error::{TransportError, UNAUTHORIZED};
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
pub use request::{
    AUTHORIZATION, CONTENT_TYPE, HttpRequest, HttpResponse, Method,
};

use std::future::Future;
use std::sync::Arc;

/// Sends requests to the backend API.
///
/// Implementations map every non-2xx status to
/// [`TransportError::Status`] so callers can tell an authentication
/// rejection apart from a network failure.
pub trait Transport: Send + Sync + 'static {
    /// Sends a request and waits for the response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).send(request)
    }
}
