//! Session refresh replay and expiry.

use super::harness::{client_user, user_json, MockReply, TestContext};
use crate::auth_fsm::SessionStatus;
use crate::effects::NotificationKind;
use crate::types::endpoints;
use crate::AuthError;
use reqwest::Method;
use serde_json::{json, Value};

const CASES: &str = "/cases";
const DOCUMENTS: &str = "/documents";

#[tokio::test]
async fn expired_session_is_refreshed_transparently() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    ctx.transport
        .queue(Method::GET, CASES, MockReply::unauthorized());
    ctx.transport
        .set_default(Method::GET, CASES, MockReply::ok(json!([{ "id": 1 }])));
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::ok(json!({})));

    let cases: Value = ctx.runtime.client().get_json(CASES).await.unwrap();

    assert_eq!(cases, json!([{ "id": 1 }]));
    assert_eq!(ctx.transport.count(Method::GET, CASES), 2);
    assert_eq!(ctx.refreshes(), 1);
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Authenticated);
    assert_eq!(ctx.navigator.redirects(), 0);
    assert!(ctx.notifier.is_empty());

    // The refresh is a mutation and carries the token
    let refresh = &ctx.transport.requests_to(Method::POST, endpoints::REFRESH)[0];
    assert_eq!(refresh.csrf_token.as_deref(), Some("t1"));
}

#[tokio::test]
async fn persistent_401_expires_session() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    let mut events = ctx.runtime.state().subscribe();
    ctx.transport
        .set_default(Method::GET, CASES, MockReply::unauthorized());
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::ok(json!({})));

    let result = ctx.runtime.client().get_json::<Value>(CASES).await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    assert_eq!(ctx.transport.count(Method::GET, CASES), 2);
    assert_eq!(ctx.refreshes(), 1);
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert!(ctx.runtime.state().user().is_none());
    assert_eq!(ctx.navigator.redirects(), 1);
    assert_eq!(ctx.notifier.kinds(), vec![NotificationKind::SessionExpired]);

    let event = events.try_recv().unwrap();
    assert_eq!(event.status, SessionStatus::Anonymous);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn failed_refresh_expires_session() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    ctx.transport
        .set_default(Method::GET, CASES, MockReply::unauthorized());
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::unauthorized());

    let result = ctx.runtime.client().get_json::<Value>(CASES).await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    // No replay after a failed refresh
    assert_eq!(ctx.transport.count(Method::GET, CASES), 1);
    assert_eq!(ctx.refreshes(), 1);
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert_eq!(ctx.navigator.redirects(), 1);
}

#[tokio::test]
async fn unreachable_refresh_expires_session() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    ctx.transport
        .set_default(Method::GET, CASES, MockReply::unauthorized());
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::Unreachable);

    let result = ctx.runtime.client().get_json::<Value>(CASES).await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert_eq!(ctx.navigator.redirects(), 1);
}

#[tokio::test]
async fn auth_namespace_401_is_not_retried() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.transport.set_default(
        Method::POST,
        endpoints::VERIFY_OTP,
        MockReply::status(401, json!({ "message": "Invalid OTP" })),
    );
    ctx.transport
        .set_default(Method::GET, endpoints::CURRENT_USER, MockReply::unauthorized());

    let session = ctx.runtime.session();
    let verify = session.verify_otp("a@x.io", "000000").await;
    assert!(matches!(verify, Err(AuthError::Unauthorized)));
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Checking);

    let me = session.fetch_current_user().await;
    assert!(matches!(me, Err(AuthError::Unauthorized)));
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);

    assert_eq!(ctx.refreshes(), 0);
    assert_eq!(ctx.transport.count(Method::POST, endpoints::VERIFY_OTP), 1);
    assert_eq!(ctx.transport.count(Method::GET, endpoints::CURRENT_USER), 1);
    assert_eq!(ctx.navigator.redirects(), 0);
    assert!(ctx.notifier.is_empty());
}

#[tokio::test]
async fn concurrent_401s_refresh_independently() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    for path in [CASES, DOCUMENTS] {
        ctx.transport
            .queue(Method::GET, path, MockReply::unauthorized());
        ctx.transport
            .set_default(Method::GET, path, MockReply::ok(json!([])));
    }
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::ok(json!({})));

    let client = ctx.runtime.client();
    let (cases, documents) = tokio::join!(
        client.get_json::<Value>(CASES),
        client.get_json::<Value>(DOCUMENTS),
    );
    cases.unwrap();
    documents.unwrap();

    // Each request runs its own refresh
    assert_eq!(ctx.refreshes(), 2);
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn repeated_expiry_transitions_once() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    let mut events = ctx.runtime.state().subscribe();
    for path in [CASES, DOCUMENTS] {
        ctx.transport
            .set_default(Method::GET, path, MockReply::unauthorized());
    }
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::unauthorized());

    let client = ctx.runtime.client();
    assert!(client.get_json::<Value>(CASES).await.is_err());
    assert!(client.get_json::<Value>(DOCUMENTS).await.is_err());

    // The second request finds the session already gone
    assert_eq!(ctx.navigator.redirects(), 1);
    assert_eq!(ctx.notifier.kinds(), vec![NotificationKind::SessionExpired]);
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);

    let event = events.try_recv().unwrap();
    assert_eq!(event.status, SessionStatus::Anonymous);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn concurrent_expiry_signals_once() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    for path in [CASES, DOCUMENTS] {
        ctx.transport
            .set_default(Method::GET, path, MockReply::unauthorized());
    }
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::unauthorized());

    let client = ctx.runtime.client();
    let (cases, documents) = tokio::join!(
        client.get_json::<Value>(CASES),
        client.get_json::<Value>(DOCUMENTS),
    );

    assert!(matches!(cases, Err(AuthError::Unauthorized)));
    assert!(matches!(documents, Err(AuthError::Unauthorized)));
    assert_eq!(ctx.refreshes(), 2);
    assert_eq!(ctx.navigator.redirects(), 1);
    assert_eq!(ctx.notifier.len(), 1);
}

#[tokio::test]
async fn refresh_session_rereads_user() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.transport
        .set_default(Method::POST, endpoints::REFRESH, MockReply::ok(json!({})));
    ctx.transport.set_default(
        Method::GET,
        endpoints::CURRENT_USER,
        MockReply::ok(json!({ "user": user_json(5, "l@x.io", "lawyer") })),
    );

    let user = ctx.runtime.session().refresh_session().await.unwrap();

    assert_eq!(user.id, "5");
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Authenticated);
    assert_eq!(ctx.refreshes(), 1);
}
