//! `DojoClient` builder and request facade.
//!
//! This is the entry point for talking to the school's API. It ties
//! together all the layers: transport → interceptor → session.

use std::sync::Arc;

use dojo_protocol::{Codec, JsonCodec, LoginRequest, TokenResponse, UserProfile};
use dojo_session::{
    FileStorage, NullStorage, ReauthCoordinator, SessionConfig, SessionStore,
    Storage,
};
use dojo_transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{
    AuthInterceptor, ClientConfig, DojoError, HttpTokenRefresher, PolicyConfig,
    RequestPolicy,
};

/// Builder for configuring a [`DojoClient`].
///
/// # Example
///
/// ```rust,no_run
/// use dojo::prelude::*;
///
/// # fn main() -> Result<(), DojoError> {
/// let client = DojoClient::builder()
///     .base_url("https://dojo.example.com/api")
///     .storage_path("/var/lib/dojo/session.json")
///     .build()?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
pub struct DojoClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn Storage>>,
}

impl DojoClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            storage: None,
        }
    }

    /// Replaces the whole configuration, e.g. one loaded from a file.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the API base URL.
    pub fn base_url(mut self, url: &str) -> Self {
        self.config.base_url = url.to_string();
        self
    }

    /// Persists the session to a JSON file at `path`.
    pub fn storage_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.storage_path = Some(path.into());
        self
    }

    /// Uses a custom storage backend. Takes precedence over `storage_path`.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the reauthentication configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the exempt-request rules.
    pub fn policy(mut self, policy: PolicyConfig) -> Self {
        self.config.policy = policy;
        self
    }

    /// Builds a client over HTTP.
    ///
    /// A storage file that can't be opened is logged and replaced by
    /// in-memory storage: the client still works, it just won't remember
    /// the session across restarts.
    ///
    /// # Errors
    /// [`DojoError::Transport`] if the base URL is invalid.
    pub fn build(self) -> Result<DojoClient<ReqwestTransport>, DojoError> {
        let transport = ReqwestTransport::new(&self.config.base_url)?;
        let storage: Arc<dyn Storage> = match (self.storage, &self.config.storage_path) {
            (Some(storage), _) => storage,
            (None, Some(path)) => match FileStorage::open(path) {
                Ok(storage) => Arc::new(storage),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "session storage unavailable, using memory");
                    Arc::new(NullStorage)
                }
            },
            (None, None) => Arc::new(NullStorage),
        };

        let session = Arc::new(SessionStore::open(storage));
        let coordinator =
            Arc::new(ReauthCoordinator::new(self.config.session.clone()));
        Ok(DojoClient::from_parts(
            transport,
            session,
            coordinator,
            self.config,
        ))
    }
}

impl Default for DojoClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An authenticated API client.
///
/// Every request goes through the [`AuthInterceptor`]; login goes
/// straight to the transport.
pub struct DojoClient<T: Transport = ReqwestTransport> {
    interceptor: AuthInterceptor<Arc<T>, HttpTokenRefresher<Arc<T>>>,
    config: ClientConfig,
    codec: JsonCodec,
}

impl DojoClient<ReqwestTransport> {
    /// Creates a new builder.
    pub fn builder() -> DojoClientBuilder {
        DojoClientBuilder::new()
    }
}

impl<T: Transport> DojoClient<T> {
    /// Assembles a client from already-built parts.
    ///
    /// Useful for sharing one store and coordinator between several
    /// clients, or for plugging in a different transport.
    pub fn from_parts(
        transport: T,
        session: Arc<SessionStore>,
        coordinator: Arc<ReauthCoordinator>,
        config: ClientConfig,
    ) -> Self {
        let transport = Arc::new(transport);
        let refresher = HttpTokenRefresher::new(
            Arc::clone(&transport),
            config.policy.refresh_path.clone(),
        );
        let interceptor = AuthInterceptor::new(
            transport,
            refresher,
            session,
            coordinator,
            RequestPolicy::new(config.policy.clone()),
        );
        Self {
            interceptor,
            config,
            codec: JsonCodec,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.interceptor.session()
    }

    pub fn coordinator(&self) -> &Arc<ReauthCoordinator> {
        self.interceptor.coordinator()
    }

    /// Sends any request through the interceptor.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DojoError> {
        Ok(self.interceptor.send(request).await?)
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse, DojoError> {
        self.send(HttpRequest::get(path)).await
    }

    /// `GET`s `path` and decodes the JSON body.
    pub async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D, DojoError> {
        let response = self.get(path).await?;
        Ok(self.codec.decode(response.body())?)
    }

    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, DojoError> {
        let body = self.codec.encode(body)?;
        self.send(HttpRequest::post(path).with_json_body(body)).await
    }

    pub async fn put_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, DojoError> {
        let body = self.codec.encode(body)?;
        self.send(HttpRequest::put(path).with_json_body(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse, DojoError> {
        self.send(HttpRequest::delete(path)).await
    }

    /// Logs in and stores the returned session.
    ///
    /// Returns the user profile when the backend includes one.
    ///
    /// # Errors
    /// - [`DojoError::Transport`] — wrong credentials (401) or network failure
    /// - [`DojoError::Protocol`] — the response had no usable access token
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserProfile>, DojoError> {
        let body = self.codec.encode(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let request =
            HttpRequest::post(self.config.policy.login_path.as_str()).with_json_body(body);
        let response = self.interceptor.transport().send(request).await?;

        let tokens: TokenResponse = self.codec.decode(response.body())?;
        let access_token = tokens.access_token()?.to_string();
        self.session().sign_in(
            access_token,
            tokens.refresh_token().map(str::to_string),
            tokens.user.clone(),
        );

        tracing::info!(role = ?tokens.user.as_ref().map(|u| u.role), "logged in");
        Ok(tokens.user)
    }

    /// Drops the local session.
    pub fn logout(&self) {
        self.session().clear();
    }
}
