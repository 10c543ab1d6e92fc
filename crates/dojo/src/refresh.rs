//! [`TokenRefresher`] over HTTP.

use dojo_protocol::{Codec, JsonCodec, RefreshRequest, TokenResponse};
use dojo_session::{RefreshedTokens, TokenRefresher};
use dojo_transport::{HttpRequest, Transport, TransportError};

/// Calls the backend's refresh-token endpoint.
///
/// Posts `{"refreshToken": "..."}` and expects a [`TokenResponse`]. The
/// request goes directly to the transport, never through the
/// interceptor, so a rejected refresh can't start another refresh.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher<T, C = JsonCodec> {
    transport: T,
    path: String,
    codec: C,
}

impl<T: Transport> HttpTokenRefresher<T> {
    pub fn new(transport: T, path: impl Into<String>) -> Self {
        Self::with_codec(transport, path, JsonCodec)
    }
}

impl<T: Transport, C: Codec> HttpTokenRefresher<T, C> {
    pub fn with_codec(transport: T, path: impl Into<String>, codec: C) -> Self {
        Self {
            transport,
            path: path.into(),
            codec,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T: Transport, C: Codec> TokenRefresher for HttpTokenRefresher<T, C> {
    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, TransportError> {
        let body = self
            .codec
            .encode(&RefreshRequest::new(refresh_token))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .transport
            .send(HttpRequest::post(self.path.as_str()).with_json_body(body))
            .await?;

        let tokens: TokenResponse = self
            .codec
            .decode(response.body())
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let access_token = tokens
            .access_token()
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?
            .to_string();

        tracing::debug!(rotated = tokens.refresh_token().is_some(), "access token refreshed");
        Ok(RefreshedTokens {
            access_token,
            refresh_token: tokens.refresh_token().map(str::to_string),
        })
    }
}
