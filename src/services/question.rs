//! Question service: rows, the store seam, and simple pagination.
//!
//! DESIGN
//! ======
//! `QuestionStore` is the persistence collaborator the feed component talks
//! to. The Postgres implementation issues one statement per call; tests swap
//! in an in-memory store with the same filtering and ordering rules.
//!
//! Pagination is "simple": a page fetches `per_page + 1` rows and the extra
//! row only answers "is there more?". No count query is ever issued.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error("user not found: {0}")]
    UserNotFound(i64),
    #[error("question not found: {0}")]
    QuestionNotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for QuestionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "E_USER_NOT_FOUND",
            Self::QuestionNotFound(_) => "E_QUESTION_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

/// Row from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
}

/// Row from the `questions` table. `to_id` is the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: Uuid,
    pub from_id: i64,
    pub to_id: i64,
    pub content: String,
    pub answer: Option<String>,
    pub is_reported: bool,
    pub pinned: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub answered_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// One page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page: page.max(1), per_page }
    }

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Rows to fetch: one extra to detect a following page.
    #[must_use]
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.per_page) + 1
    }
}

/// A page of rows plus a has-more flag. Never carries a total count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimplePage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

impl<T> SimplePage<T> {
    /// Build a page from up to `fetch_limit()` rows.
    #[must_use]
    pub fn from_overfetch(mut rows: Vec<T>, request: PageRequest) -> Self {
        let per_page = usize::try_from(request.per_page).unwrap_or(usize::MAX);
        let has_more = rows.len() > per_page;
        rows.truncate(per_page);
        Self { items: rows, page: request.page, per_page: request.per_page, has_more }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Persistence seam for the question feed.
#[async_trait::async_trait]
pub trait QuestionStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, QuestionError>;

    /// Answered, non-reported questions received by `user_id`, ordered
    /// pinned first, then most recently answered.
    async fn received_feed(&self, user_id: i64, request: PageRequest) -> Result<SimplePage<Question>, QuestionError>;

    async fn find_question(&self, question_id: Uuid) -> Result<Option<Question>, QuestionError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_question(&self, question_id: Uuid) -> Result<bool, QuestionError>;
}

/// Look up a user, failing with `UserNotFound` when absent.
///
/// # Errors
///
/// Returns `UserNotFound` or a store error.
pub async fn find_user_or_fail(store: &dyn QuestionStore, user_id: i64) -> Result<User, QuestionError> {
    store
        .find_user(user_id)
        .await?
        .ok_or(QuestionError::UserNotFound(user_id))
}

/// Look up a question by its string id, failing with `QuestionNotFound`
/// when the id is malformed or no row exists.
///
/// # Errors
///
/// Returns `QuestionNotFound` or a store error.
pub async fn find_question_or_fail(store: &dyn QuestionStore, raw_id: &str) -> Result<Question, QuestionError> {
    let Ok(question_id) = Uuid::parse_str(raw_id.trim()) else {
        return Err(QuestionError::QuestionNotFound(raw_id.to_owned()));
    };
    store
        .find_question(question_id)
        .await?
        .ok_or_else(|| QuestionError::QuestionNotFound(raw_id.to_owned()))
}

// =============================================================================
// POSTGRES
// =============================================================================

const QUESTION_COLUMNS: &str =
    "id, from_id, to_id, content, answer, is_reported, pinned, answered_at, created_at";

/// `QuestionStore` backed by the shared SQLx pool.
#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuestionStore for PgQuestionStore {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, QuestionError> {
        let row = sqlx::query_as::<_, (i64, String, String)>("SELECT id, name, username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, name, username)| User { id, name, username }))
    }

    async fn received_feed(&self, user_id: i64, request: PageRequest) -> Result<SimplePage<Question>, QuestionError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS}
             FROM questions
             WHERE to_id = $1 AND is_reported = false AND answer IS NOT NULL
             ORDER BY pinned DESC, answered_at DESC NULLS LAST
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(request.fetch_limit())
            .bind(request.offset())
            .fetch_all(&self.pool)
            .await?;

        let questions = rows.iter().map(question_from_row).collect();
        Ok(SimplePage::from_overfetch(questions, request))
    }

    async fn find_question(&self, question_id: Uuid) -> Result<Option<Question>, QuestionError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(question_from_row))
    }

    async fn delete_question(&self, question_id: Uuid) -> Result<bool, QuestionError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn question_from_row(row: &PgRow) -> Question {
    Question {
        id: row.get("id"),
        from_id: row.get("from_id"),
        to_id: row.get("to_id"),
        content: row.get("content"),
        answer: row.get("answer"),
        is_reported: row.get("is_reported"),
        pinned: row.get("pinned"),
        answered_at: row.get("answered_at"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
#[path = "question_test.rs"]
mod tests;
