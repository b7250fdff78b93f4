//! OTP login, current user, logout and the local cookie check.

use super::harness::{client_user, lawyer_user, user_json, MockReply, TestContext};
use crate::auth_fsm::SessionStatus;
use crate::effects::NotificationKind;
use crate::types::{endpoints, UserRole};
use crate::AuthError;
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn request_otp_sends_email_and_role() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.transport
        .set_default(Method::POST, endpoints::REQUEST_OTP, MockReply::ok(json!({})));

    ctx.runtime
        .session()
        .request_otp("l@x.io", UserRole::Lawyer)
        .await
        .unwrap();

    let request = &ctx.transport.requests_to(Method::POST, endpoints::REQUEST_OTP)[0];
    assert_eq!(
        request.body,
        Some(json!({ "email": "l@x.io", "role": "lawyer" }))
    );
    assert!(ctx.runtime.state().otp_sent());
    // Requesting a code does not change the status
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Checking);
}

#[tokio::test]
async fn request_otp_failure_records_error() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.transport.set_default(
        Method::POST,
        endpoints::REQUEST_OTP,
        MockReply::status(429, json!({ "message": "Too many OTP requests" })),
    );

    let result = ctx
        .runtime
        .session()
        .request_otp("a@x.io", UserRole::Client)
        .await;

    assert!(matches!(result, Err(AuthError::RateLimited)));
    let snapshot = ctx.runtime.state().snapshot();
    assert!(!snapshot.otp_sent);
    assert!(snapshot.error.is_some());
    assert_eq!(ctx.notifier.kinds(), vec![NotificationKind::RateLimited]);
}

#[tokio::test]
async fn verify_failure_keeps_status_and_records_error() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.runtime.session().check_session();
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    ctx.transport.set_default(
        Method::POST,
        endpoints::VERIFY_OTP,
        MockReply::status(400, json!({ "message": "Invalid or expired OTP" })),
    );

    let result = ctx.runtime.session().verify_otp("a@x.io", "999999").await;

    assert!(matches!(result, Err(AuthError::Validation { status: 400, .. })));
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    let error = ctx.runtime.state().last_error().unwrap();
    assert!(error.contains("Invalid or expired OTP"));

    ctx.runtime.state().clear_error();
    assert!(ctx.runtime.state().last_error().is_none());
}

#[tokio::test]
async fn verify_without_user_is_invalid_response() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.transport
        .set_default(Method::POST, endpoints::VERIFY_OTP, MockReply::ok(json!({})));

    let result = ctx.runtime.session().verify_otp("a@x.io", "123456").await;

    assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
    assert!(!ctx.runtime.state().is_authenticated());
}

#[tokio::test]
async fn login_as_another_user_replaces_user() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    ctx.transport.set_default(
        Method::POST,
        endpoints::VERIFY_OTP,
        MockReply::ok(json!({ "user": user_json(42, "counsel@x.io", "lawyer") })),
    );

    let user = ctx
        .runtime
        .session()
        .verify_otp("counsel@x.io", "123456")
        .await
        .unwrap();

    assert_eq!(user.id, lawyer_user().id);
    assert_eq!(
        ctx.runtime.state().user().map(|u| u.role),
        Some(UserRole::Lawyer)
    );
}

#[tokio::test]
async fn fetch_current_user_confirms_session() {
    let ctx = TestContext::new();
    ctx.transport.set_default(
        Method::GET,
        endpoints::CURRENT_USER,
        MockReply::ok(json!({ "user": user_json(3, "c@x.io", "admin") })),
    );

    let user = ctx.runtime.session().fetch_current_user().await.unwrap();

    assert_eq!(user.email, "c@x.io");
    assert_eq!(user.role, UserRole::Admin);
    let snapshot = ctx.runtime.state().snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(snapshot.user, Some(user));
    // A confirmation is not a login
    assert!(snapshot.last_login_at.is_none());
}

#[tokio::test]
async fn fetch_current_user_failure_goes_anonymous() {
    let ctx = TestContext::new();
    ctx.sign_in(client_user());
    ctx.transport.set_default(
        Method::GET,
        endpoints::CURRENT_USER,
        MockReply::status(500, json!({})),
    );

    let result = ctx.runtime.session().fetch_current_user().await;

    assert!(matches!(result, Err(AuthError::ServerError { .. })));
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert!(ctx.runtime.state().user().is_none());
}

#[tokio::test]
async fn fetch_current_user_without_user_goes_anonymous() {
    let ctx = TestContext::new();
    ctx.transport.set_default(
        Method::GET,
        endpoints::CURRENT_USER,
        MockReply::ok(json!({ "user": null })),
    );

    let result = ctx.runtime.session().fetch_current_user().await;

    assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn logout_clears_session_cookie_and_state() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    ctx.jar.set("connect.sid", "s%3Aabc");
    ctx.transport.set_default(
        Method::POST,
        endpoints::LOGOUT,
        MockReply::ok(json!({ "message": "Logged out" }))
            .with_cookie("connect.sid=; Path=/; Max-Age=0"),
    );

    ctx.runtime.session().logout().await;

    let snapshot = ctx.runtime.state().snapshot();
    assert_eq!(snapshot.status, SessionStatus::Anonymous);
    assert!(snapshot.user.is_none());
    assert!(snapshot.last_login_at.is_none());
    assert!(!ctx.runtime.session().has_session_cookie());
    assert!(ctx.runtime.csrf().cached().is_none());
    assert_eq!(
        ctx.transport.requests_to(Method::POST, endpoints::LOGOUT)[0]
            .csrf_token
            .as_deref(),
        Some("t1")
    );
}

#[tokio::test]
async fn logout_succeeds_locally_when_server_unreachable() {
    let ctx = TestContext::new();
    ctx.serve_csrf_token("t1");
    ctx.sign_in(client_user());
    ctx.transport
        .set_default(Method::POST, endpoints::LOGOUT, MockReply::Unreachable);

    ctx.runtime.session().logout().await;

    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert!(ctx.runtime.state().user().is_none());
    assert_eq!(
        ctx.notifier.kinds(),
        vec![NotificationKind::NetworkUnreachable]
    );
    assert_eq!(ctx.navigator.redirects(), 0);
}

#[tokio::test]
async fn check_session_without_cookie_goes_anonymous() {
    let ctx = TestContext::new();

    assert!(!ctx.runtime.session().check_session());
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert!(ctx.transport.requests().is_empty());
}

#[tokio::test]
async fn check_session_with_cookie_changes_nothing() {
    let ctx = TestContext::new();
    ctx.jar.set("connect.sid", "s%3Aabc");

    assert!(ctx.runtime.session().check_session());
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Checking);
    assert!(ctx.transport.requests().is_empty());
}

#[tokio::test]
async fn check_session_downgrades_authenticated_without_cookie() {
    let ctx = TestContext::new();
    ctx.sign_in(client_user());
    let mut events = ctx.runtime.state().subscribe();

    assert!(!ctx.runtime.session().check_session());

    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert!(ctx.runtime.state().user().is_none());
    assert_eq!(events.try_recv().unwrap().status, SessionStatus::Anonymous);
    assert!(ctx.transport.requests().is_empty());
}

#[tokio::test]
async fn check_session_keeps_recorded_error() {
    let ctx = TestContext::new();
    ctx.transport
        .set_default(Method::GET, endpoints::CURRENT_USER, MockReply::unauthorized());

    let session = ctx.runtime.session();
    assert!(session.fetch_current_user().await.is_err());
    let error = ctx.runtime.state().last_error();
    assert!(error.is_some());

    assert!(!session.check_session());
    assert_eq!(ctx.runtime.state().status(), SessionStatus::Anonymous);
    assert_eq!(ctx.runtime.state().last_error(), error);
}
