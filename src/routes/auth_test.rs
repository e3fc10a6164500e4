use super::*;
use crate::state::test_helpers;
use axum::extract::FromRequestParts;
use axum::http::{Request, header};

fn parts_with_cookie(cookie: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/questions/x");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    parts
}

// =============================================================================
// session_token
// =============================================================================

#[test]
fn session_token_reads_named_cookie() {
    let parts = parts_with_cookie(Some("theme=dark; session_token=abc123"));
    assert_eq!(session_token(&parts).as_deref(), Some("abc123"));
}

#[test]
fn session_token_missing_or_empty_is_none() {
    assert!(session_token(&parts_with_cookie(None)).is_none());
    assert!(session_token(&parts_with_cookie(Some("session_token="))).is_none());
    assert!(session_token(&parts_with_cookie(Some("other=1"))).is_none());
}

// =============================================================================
// AuthUser
// =============================================================================

#[tokio::test]
async fn auth_user_without_cookie_is_unauthorized() {
    let state = test_helpers::test_app_state();
    let mut parts = parts_with_cookie(None);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.err(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn auth_user_with_malformed_token_is_unauthorized_without_db() {
    let state = test_helpers::test_app_state();
    let mut parts = parts_with_cookie(Some("session_token=short"));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.err(), Some(StatusCode::UNAUTHORIZED));
}

// =============================================================================
// MaybeAuthUser
// =============================================================================

#[tokio::test]
async fn maybe_auth_user_without_cookie_is_guest() {
    let state = test_helpers::test_app_state();
    let mut parts = parts_with_cookie(None);
    let MaybeAuthUser(principal) = MaybeAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert!(principal.is_none());
}

#[tokio::test]
async fn maybe_auth_user_with_malformed_token_is_guest() {
    let state = test_helpers::test_app_state();
    let mut parts = parts_with_cookie(Some("session_token=not-a-token!"));
    let MaybeAuthUser(principal) = MaybeAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert!(principal.is_none());
}

#[tokio::test]
async fn maybe_auth_user_surfaces_database_failure() {
    // Plausible token shape forces a lookup against the unreachable pool.
    let state = test_helpers::test_app_state();
    let mut parts = parts_with_cookie(Some(&format!("session_token={}", "a1".repeat(16))));
    let result = MaybeAuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.err(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}
