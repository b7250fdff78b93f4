//! Integration tests for the session layer.
//!
//! - `harness.rs`      - MockTransport, MemoryCookieJar and TestContext
//! - `csrf.rs`         - token resolution, single-flight fetch, CSRF replay
//! - `auth_retry.rs`   - session refresh replay and expiry
//! - `errors.rs`       - error taxonomy and notifications
//! - `session_flow.rs` - OTP login, current user, logout, local check
//! - `bootstrap.rs`    - startup check and login grace period

mod auth_retry;
mod session_flow;

use crate::auth_fsm::SessionStatus;
use crate::types::{endpoints, UserRole};
use harness::{user_json, MockReply, TestContext};
use reqwest::Method;
use serde_json::json;

/// OTP login from a cold start.
#[tokio::test]
async fn basic_workflow() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.transport.queue(
        Method::GET,
        endpoints::CURRENT_USER,
        MockReply::unauthorized(),
    );
    ctx.transport
        .queue(Method::POST, endpoints::REQUEST_OTP, MockReply::ok(json!({})));
    ctx.transport.queue(
        Method::POST,
        endpoints::VERIFY_OTP,
        MockReply::ok(json!({ "user": user_json(1, "a@x.io", "client") }))
            .with_cookie("connect.sid=s%3Aabc; Path=/; HttpOnly"),
    );

    let session = ctx.runtime.session();
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Checking);

    // Startup: no session yet
    ctx.runtime.bootstrap().await;
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert!(!session.has_session_cookie());

    // Request a code
    session
        .request_otp("a@x.io", UserRole::Client)
        .await
        .unwrap();
    assert!(ctx.runtime.state().otp_sent());

    // Verify it
    let user = session.verify_otp("a@x.io", "123456").await.unwrap();
    assert_eq!(user.id, "1");
    assert_eq!(user.role, UserRole::Client);

    let snapshot = ctx.runtime.state().snapshot();
    assert_eq!(snapshot.status, SessionStatus::Authenticated);
    assert!(!snapshot.otp_sent);
    assert!(session.has_session_cookie());

    // One token fetch served both mutations
    assert_eq!(ctx.csrf_fetches(), 1);
    for request in ctx.transport.requests_to(Method::POST, endpoints::VERIFY_OTP) {
        assert_eq!(request.csrf_token.as_deref(), Some("t1"));
        assert_eq!(
            request.body,
            Some(json!({ "email": "a@x.io", "otp": "123456" }))
        );
    }
    assert!(ctx.notifier.is_empty());
}
