//! Session-cookie extractors.
//!
//! `AuthUser` rejects the request without a valid session; `MaybeAuthUser`
//! resolves to a guest instead, for surfaces that serve both.

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::services::policy::Principal;
use crate::services::session;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

fn session_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub principal: Principal,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let principal = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session validation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { principal })
    }
}

/// Acting principal if the request carries a valid session, otherwise a guest.
pub struct MaybeAuthUser(pub Option<Principal>);

impl<S> axum::extract::FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts) else {
            return Ok(Self(None));
        };

        let app_state = AppState::from_ref(state);
        let principal = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session validation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        Ok(Self(principal))
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
