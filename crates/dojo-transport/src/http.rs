//! HTTP transport implementation using `reqwest`.

use std::collections::BTreeMap;

use reqwest::Url;

use crate::{HttpRequest, HttpResponse, Method, Transport, TransportError};

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A [`Transport`] that talks to the backend over HTTP(S).
///
/// Request paths are resolved against `base_url`, so `/events` against
/// `https://api.example.com/v1` becomes `https://api.example.com/v1/events`.
/// `reqwest::Client` is reference counted internally, so cloning the
/// transport is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Creates a transport around an existing client (custom timeouts,
    /// proxies, TLS roots).
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
    ) -> Result<Self, TransportError> {
        // Without the trailing slash `Url::join` would replace the last
        // path segment instead of appending to it.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            TransportError::InvalidRequest(format!(
                "invalid base URL {base_url}: {e}"
            ))
        })?;
        tracing::info!(%base_url, "HTTP transport ready");
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                TransportError::InvalidRequest(format!("invalid path {path}: {e}"))
            })
    }
}

impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(request.path())?;
        let method = request.method();

        let mut builder = self.client.request(method.into(), url);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .to_vec();

        if !(200..300).contains(&status) {
            tracing::debug!(%method, path = request.path(), status, "request rejected");
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let response = headers
            .into_iter()
            .fold(HttpResponse::new(status, body), |resp, (name, value)| {
                resp.with_header(name, value)
            });
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_appends_to_base_path() {
        let transport =
            ReqwestTransport::new("https://api.example.com/v1").unwrap();
        let url = transport.url_for("/events").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/events");
    }

    #[test]
    fn test_url_for_keeps_query_string() {
        let transport =
            ReqwestTransport::new("https://api.example.com/").unwrap();
        let url = transport.url_for("/articles?page=2").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/articles?page=2");
    }

    #[test]
    fn test_new_rejects_garbage_base_url() {
        let result = ReqwestTransport::new("not a url");
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }
}
