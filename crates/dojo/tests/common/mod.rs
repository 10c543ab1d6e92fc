//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dojo::prelude::*;
use dojo_session::RefreshedTokens;

type Handler =
    Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// A transport that answers with a closure and records every request.
pub struct ScriptedTransport {
    handler: Handler,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Accepts only `Bearer <token>`; everything else gets a 401.
    pub fn accepting(token: &'static str) -> Self {
        Self::new(move |req| {
            if req.bearer_token() == Some(token) {
                Ok(HttpResponse::ok(b"ok".to_vec()))
            } else {
                Err(unauthorized())
            }
        })
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = (self.handler)(&request);
        self.sent.lock().unwrap().push(request);
        reply
    }
}

/// A refresher that hands out a fixed answer and counts calls.
pub struct StubRefresher {
    reply: Result<RefreshedTokens, TransportError>,
    calls: AtomicUsize,
}

impl StubRefresher {
    pub fn issuing(access_token: &str) -> Self {
        Self {
            reply: Ok(RefreshedTokens {
                access_token: access_token.to_string(),
                refresh_token: None,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rotating(access_token: &str, refresh_token: &str) -> Self {
        Self {
            reply: Ok(RefreshedTokens {
                access_token: access_token.to_string(),
                refresh_token: Some(refresh_token.to_string()),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenRefresher for StubRefresher {
    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedTokens, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

pub fn unauthorized() -> TransportError {
    TransportError::Status {
        status: 401,
        body: "token expired".into(),
    }
}

/// A store holding `access`/`refresh`, either of which may be absent.
pub fn store_with(access: Option<&str>, refresh: Option<&str>) -> Arc<SessionStore> {
    let storage = MemoryStorage::new();
    if let Some(access) = access {
        storage.set(dojo_session::ACCESS_TOKEN_KEY, access).unwrap();
    }
    if let Some(refresh) = refresh {
        storage.set(dojo_session::REFRESH_TOKEN_KEY, refresh).unwrap();
    }
    Arc::new(SessionStore::open(Arc::new(storage)))
}

/// Spawns a "user" that answers the next dialog with `choice`.
pub fn answer_next_dialog(
    coordinator: &Arc<ReauthCoordinator>,
    choice: Choice,
) -> tokio::task::JoinHandle<usize> {
    let coordinator = Arc::clone(coordinator);
    let mut status = coordinator.watch();
    tokio::spawn(async move {
        status
            .wait_for(|s| s.is_open())
            .await
            .expect("coordinator alive");
        coordinator.resolve(choice).expect("dialog is open")
    })
}
