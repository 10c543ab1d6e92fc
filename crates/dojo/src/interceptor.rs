//! Per-request authentication: attach the token, recover from a 401.
//!
//! Every API call goes through [`AuthInterceptor::send`]. The flow is:
//!   1. Attach `Authorization: Bearer <access>` if we have a token
//!   2. Send; a success (or any non-401 failure) goes straight back
//!   3. On 401, decide whether this request may recover:
//!      exempt requests, followers of an open dialog, and sessions with no
//!      refresh token give up immediately
//!   4. Otherwise open the dialog and act on the user's choice:
//!      refresh and retry once, or log out
//!
//! Only the request that opened the dialog refreshes and retries. Requests
//! that fail while the dialog is open return their own 401 instead of
//! piling up N refresh calls.

use std::sync::Arc;

use dojo_session::{Choice, ReauthCoordinator, SessionStore, TokenRefresher};
use dojo_transport::{HttpRequest, HttpResponse, Transport, TransportError};

use crate::{RequestClass, RequestPolicy};

/// Wraps a [`Transport`] with bearer credentials and session recovery.
///
/// The interceptor never invents errors: the caller sees the transport's
/// own error, except when a refresh attempt fails, in which case the
/// refresh error replaces it.
pub struct AuthInterceptor<T, R> {
    transport: T,
    refresher: R,
    session: Arc<SessionStore>,
    coordinator: Arc<ReauthCoordinator>,
    policy: RequestPolicy,
}

impl<T, R> AuthInterceptor<T, R>
where
    T: Transport,
    R: TokenRefresher,
{
    pub fn new(
        transport: T,
        refresher: R,
        session: Arc<SessionStore>,
        coordinator: Arc<ReauthCoordinator>,
        policy: RequestPolicy,
    ) -> Self {
        Self {
            transport,
            refresher,
            session,
            coordinator,
            policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn coordinator(&self) -> &Arc<ReauthCoordinator> {
        &self.coordinator
    }

    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    /// Sends `request` with credentials, recovering from an expired
    /// session when possible.
    pub async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        // --- Step 1: Attach the token ---
        let token = self.session.access_token();
        let outgoing = match &token {
            Some(token) => request.clone().with_bearer(token),
            None => request.clone(),
        };

        // --- Step 2: Send ---
        let error = match self.transport.send(outgoing).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };
        if !error.is_unauthorized() {
            return Err(error);
        }

        // --- Step 3: Should this request recover? ---
        let method = request.method();
        let path = request.path();
        if let RequestClass::Exempt(reason) =
            self.policy.classify(&request, token.is_some())
        {
            tracing::debug!(%method, path, %reason, "401 on exempt request");
            return Err(error);
        }

        if self.coordinator.is_dialog_open() {
            tracing::debug!(%method, path, "401 while reauthentication is pending");
            return Err(error);
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            tracing::info!(%method, path, "401 with no refresh token, logging out");
            self.session.clear();
            return Err(error);
        };

        // A concurrent request may have opened the dialog since the check
        // above; `try_open_dialog` settles the race atomically.
        let Some(stream) = self.coordinator.try_open_dialog() else {
            return Err(error);
        };

        // --- Step 4: Act on the user's choice ---
        match self.coordinator.wait(stream).await {
            Some(Choice::Refresh) => self.refresh_and_retry(request, &refresh_token).await,
            Some(Choice::Logout) => {
                tracing::info!(%method, path, "user chose to log out");
                self.session.clear();
                Err(error)
            }
            None => Err(error),
        }
    }

    /// Refreshes the session and resends `request` exactly once.
    ///
    /// The retry goes straight to the transport, so a second 401 is
    /// returned as-is instead of starting another cycle.
    async fn refresh_and_retry(
        &self,
        request: HttpRequest,
        refresh_token: &str,
    ) -> Result<HttpResponse, TransportError> {
        let tokens = match self.refresher.refresh(refresh_token).await {
            Ok(tokens) => tokens,
            Err(error) => {
                tracing::warn!(%error, "token refresh failed, logging out");
                self.session.clear();
                return Err(error);
            }
        };

        let retry = request.with_bearer(&tokens.access_token);
        let refresh_token = tokens
            .refresh_token
            .or_else(|| Some(refresh_token.to_string()));
        self.session.set_credentials(tokens.access_token, refresh_token);

        tracing::info!(method = %retry.method(), path = retry.path(), "session refreshed, retrying request");
        self.transport.send(retry).await
    }
}
