//! Session lookup: resolves a session token to the acting principal.
//!
//! ARCHITECTURE
//! ============
//! Sessions are issued elsewhere (login flow); this service only reads them.
//! A token that is unknown or expired resolves to no principal, which the
//! feed treats as a guest.

use sqlx::{PgPool, Row};

use crate::services::policy::Principal;

/// Validate a session token and return the associated principal.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<Principal>, sqlx::Error> {
    if !is_plausible_token(token) {
        return Ok(None);
    }

    let row = sqlx::query(
        r"SELECT u.id, u.name
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Principal { user_id: r.get("id"), name: r.get("name") }))
}

/// Cheap shape check so obviously bogus cookies never reach the database.
pub(crate) fn is_plausible_token(token: &str) -> bool {
    (16..=128).contains(&token.len()) && token.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
