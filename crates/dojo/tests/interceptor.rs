//! End-to-end behavior of the 401 recovery flow.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    ScriptedTransport, StubRefresher, answer_next_dialog, store_with, unauthorized,
};
use dojo::prelude::*;
use futures_util::future::join_all;

type Interceptor = AuthInterceptor<Arc<ScriptedTransport>, Arc<StubRefresher>>;

struct Harness {
    interceptor: Interceptor,
    transport: Arc<ScriptedTransport>,
    refresher: Arc<StubRefresher>,
    session: Arc<SessionStore>,
    coordinator: Arc<ReauthCoordinator>,
}

fn harness(
    transport: ScriptedTransport,
    refresher: StubRefresher,
    session: Arc<SessionStore>,
    config: SessionConfig,
) -> Harness {
    let transport = Arc::new(transport);
    let refresher = Arc::new(refresher);
    let coordinator = Arc::new(ReauthCoordinator::new(config));
    let interceptor = AuthInterceptor::new(
        Arc::clone(&transport),
        Arc::clone(&refresher),
        Arc::clone(&session),
        Arc::clone(&coordinator),
        RequestPolicy::new(PolicyConfig::default()),
    );
    Harness {
        interceptor,
        transport,
        refresher,
        session,
        coordinator,
    }
}

/// Expired session: the backend only accepts `newA`.
fn expired_session() -> Harness {
    harness(
        ScriptedTransport::accepting("newA"),
        StubRefresher::issuing("newA"),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    )
}

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn test_send_attaches_bearer_token() {
    let h = harness(
        ScriptedTransport::accepting("oldA"),
        StubRefresher::issuing("unused"),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    );

    let response = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap();

    assert_eq!(response.status(), 200);
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header("authorization"), Some("Bearer oldA"));
    assert_eq!(h.coordinator.cycles_opened(), 0);
}

#[tokio::test]
async fn test_send_without_token_sends_no_authorization_header() {
    let h = harness(
        ScriptedTransport::new(|_| Ok(HttpResponse::ok(b"[]".to_vec()))),
        StubRefresher::issuing("unused"),
        store_with(None, None),
        SessionConfig::default(),
    );

    h.interceptor.send(HttpRequest::get("/events")).await.unwrap();

    assert_eq!(h.transport.sent()[0].header("authorization"), None);
}

#[tokio::test]
async fn test_send_network_error_passes_through_untouched() {
    let h = harness(
        ScriptedTransport::new(|_| Err(TransportError::Network("connection reset".into()))),
        StubRefresher::issuing("unused"),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    );

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    assert_eq!(error, TransportError::Network("connection reset".into()));
    assert_eq!(h.coordinator.cycles_opened(), 0);
    assert_eq!(h.session.access_token().as_deref(), Some("oldA"));
}

#[tokio::test]
async fn test_send_server_error_does_not_open_dialog() {
    let h = harness(
        ScriptedTransport::new(|_| {
            Err(TransportError::Status {
                status: 500,
                body: "boom".into(),
            })
        }),
        StubRefresher::issuing("unused"),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    );

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    assert_eq!(error.status(), Some(500));
    assert_eq!(h.coordinator.cycles_opened(), 0);
}

// =========================================================================
// Refresh and retry
// =========================================================================

#[tokio::test]
async fn test_send_refresh_choice_retries_with_new_token() {
    let h = expired_session();
    let presenter = answer_next_dialog(&h.coordinator, Choice::Refresh);

    let response = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(presenter.await.unwrap(), 1);
    assert_eq!(h.refresher.calls(), 1);

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].bearer_token(), Some("oldA"));
    assert_eq!(sent[1].bearer_token(), Some("newA"));
    assert_eq!(sent[1].path(), "/profile");

    // Refresh token was not rotated, so the old one stays.
    assert_eq!(h.session.access_token().as_deref(), Some("newA"));
    assert_eq!(h.session.refresh_token().as_deref(), Some("r1"));
    assert!(!h.coordinator.is_dialog_open());
}

#[tokio::test]
async fn test_send_burst_of_401s_opens_one_dialog_and_only_opener_retries() {
    let h = expired_session();
    let presenter = answer_next_dialog(&h.coordinator, Choice::Refresh);

    let requests = (0..5).map(|i| {
        h.interceptor
            .send(HttpRequest::get(format!("/classes/{i}")))
    });
    let results = join_all(requests).await;

    let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    assert_eq!(ok.len(), 1, "exactly the opener recovers");
    assert_eq!(failed.len(), 4);
    for error in failed {
        assert_eq!(error.unwrap_err(), unauthorized(), "followers get their own 401");
    }

    assert_eq!(presenter.await.unwrap(), 1);
    assert_eq!(h.coordinator.cycles_opened(), 1);
    assert_eq!(h.refresher.calls(), 1);
    // Five originals plus one retry.
    assert_eq!(h.transport.sent_count(), 6);
    let retried: Vec<_> = h
        .transport
        .sent()
        .into_iter()
        .filter(|r| r.bearer_token() == Some("newA"))
        .collect();
    assert_eq!(retried.len(), 1);
}

#[tokio::test]
async fn test_send_retry_rejected_again_returns_401_without_new_cycle() {
    let h = harness(
        ScriptedTransport::new(|_| Err(unauthorized())),
        StubRefresher::issuing("newA"),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    );
    let presenter = answer_next_dialog(&h.coordinator, Choice::Refresh);

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    assert!(error.is_unauthorized());
    presenter.await.unwrap();
    assert_eq!(h.transport.sent_count(), 2, "original plus exactly one retry");
    assert_eq!(h.coordinator.cycles_opened(), 1);
    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn test_send_refresh_failure_clears_session_and_returns_refresh_error() {
    let refresh_error = TransportError::Status {
        status: 403,
        body: "refresh token revoked".into(),
    };
    let h = harness(
        ScriptedTransport::accepting("newA"),
        StubRefresher::failing(refresh_error.clone()),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    );
    let presenter = answer_next_dialog(&h.coordinator, Choice::Refresh);

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    presenter.await.unwrap();
    assert_eq!(error, refresh_error);
    assert_eq!(h.session.access_token(), None);
    assert_eq!(h.session.refresh_token(), None);
    assert_eq!(h.transport.sent_count(), 1, "no retry after a failed refresh");
}

#[tokio::test]
async fn test_send_rotated_refresh_token_replaces_old_one() {
    let h = harness(
        ScriptedTransport::accepting("newA"),
        StubRefresher::rotating("newA", "r2"),
        store_with(Some("oldA"), Some("r1")),
        SessionConfig::default(),
    );
    let presenter = answer_next_dialog(&h.coordinator, Choice::Refresh);

    h.interceptor.send(HttpRequest::get("/profile")).await.unwrap();

    presenter.await.unwrap();
    assert_eq!(h.session.access_token().as_deref(), Some("newA"));
    assert_eq!(h.session.refresh_token().as_deref(), Some("r2"));
}

// =========================================================================
// Logout and forced logout
// =========================================================================

#[tokio::test]
async fn test_send_logout_choice_clears_session_without_retry() {
    let h = expired_session();
    let presenter = answer_next_dialog(&h.coordinator, Choice::Logout);

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    presenter.await.unwrap();
    assert_eq!(error, unauthorized());
    assert_eq!(h.session.access_token(), None);
    assert_eq!(h.session.refresh_token(), None);
    assert_eq!(h.refresher.calls(), 0);
    assert_eq!(h.transport.sent_count(), 1);
}

#[tokio::test]
async fn test_send_burst_with_logout_choice_returns_401_to_every_caller() {
    let h = expired_session();
    let presenter = answer_next_dialog(&h.coordinator, Choice::Logout);

    let requests = (0..5).map(|i| {
        h.interceptor
            .send(HttpRequest::get(format!("/classes/{i}")))
    });
    let results = join_all(requests).await;

    assert_eq!(presenter.await.unwrap(), 1);
    for result in results {
        assert_eq!(result.unwrap_err(), unauthorized());
    }
    assert_eq!(h.session.credentials(), Default::default());
    assert_eq!(h.session.access_token(), None);
    assert_eq!(h.session.refresh_token(), None);
    assert_eq!(h.coordinator.cycles_opened(), 1);
    assert_eq!(h.refresher.calls(), 0);
    assert_eq!(h.transport.sent_count(), 5, "no retries after logout");
}

#[tokio::test]
async fn test_send_without_refresh_token_clears_session_and_skips_dialog() {
    let h = harness(
        ScriptedTransport::accepting("newA"),
        StubRefresher::issuing("newA"),
        store_with(Some("oldA"), None),
        SessionConfig::default(),
    );

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    assert_eq!(error, unauthorized());
    assert_eq!(h.session.access_token(), None);
    assert_eq!(h.coordinator.cycles_opened(), 0);
    assert_eq!(h.refresher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_dialog_timeout_falls_back_to_logout() {
    let config = SessionConfig {
        dialog_timeout: Some(Duration::from_secs(30)),
        ..SessionConfig::default()
    };
    let h = harness(
        ScriptedTransport::accepting("newA"),
        StubRefresher::issuing("newA"),
        store_with(Some("oldA"), Some("r1")),
        config,
    );

    // Nobody answers; paused time auto-advances to the deadline.
    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    assert_eq!(error, unauthorized());
    assert!(!h.coordinator.is_dialog_open());
    assert_eq!(h.session.access_token(), None);
    assert_eq!(h.refresher.calls(), 0);
}

// =========================================================================
// Exempt requests
// =========================================================================

#[tokio::test]
async fn test_send_public_listing_without_token_bypasses_recovery() {
    let h = harness(
        ScriptedTransport::new(|_| Err(unauthorized())),
        StubRefresher::issuing("newA"),
        store_with(None, Some("r1")),
        SessionConfig::default(),
    );

    let error = h.interceptor.send(HttpRequest::get("/events?page=2")).await.unwrap_err();

    assert_eq!(error, unauthorized());
    assert_eq!(h.coordinator.cycles_opened(), 0);
    assert_eq!(h.refresher.calls(), 0);
    // Store untouched.
    assert_eq!(h.session.refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_send_anonymous_registration_bypasses_recovery() {
    let h = harness(
        ScriptedTransport::new(|_| Err(unauthorized())),
        StubRefresher::issuing("newA"),
        store_with(None, Some("r1")),
        SessionConfig::default(),
    );

    let request = HttpRequest::post("/registrations").with_json_body(b"{}".to_vec());
    let error = h.interceptor.send(request).await.unwrap_err();

    assert_eq!(error, unauthorized());
    assert_eq!(h.coordinator.cycles_opened(), 0);
    assert_eq!(h.session.refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_send_refresh_endpoint_401_never_recurses() {
    let h = expired_session();

    let error = h
        .interceptor
        .send(HttpRequest::post("/auth/refresh-token"))
        .await
        .unwrap_err();

    assert!(error.is_unauthorized());
    assert_eq!(h.coordinator.cycles_opened(), 0);
}

#[tokio::test]
async fn test_send_opt_out_header_bypasses_recovery() {
    let h = expired_session();

    let request = HttpRequest::get("/profile").with_header("X-Skip-Reauth", "1");
    let error = h.interceptor.send(request).await.unwrap_err();

    assert!(error.is_unauthorized());
    assert_eq!(h.coordinator.cycles_opened(), 0);
    assert_eq!(h.session.access_token().as_deref(), Some("oldA"));
}

#[tokio::test]
async fn test_send_while_dialog_open_returns_401_immediately() {
    let h = expired_session();
    let _held = h.coordinator.open_dialog();

    let error = h.interceptor.send(HttpRequest::get("/profile")).await.unwrap_err();

    assert_eq!(error, unauthorized());
    assert_eq!(h.coordinator.cycles_opened(), 1);
    h.coordinator.resolve(Choice::Logout).unwrap();
    // The follower did not log out; only whoever handles the choice does.
    assert_eq!(h.session.access_token().as_deref(), Some("oldA"));
}
