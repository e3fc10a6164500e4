//! Question feed REST routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::info;

use crate::component::question_list::{self, FeedError, QuestionListView, RenderedView};
use crate::routes::auth::AuthUser;
use crate::services::bus::Audience;
use crate::services::question::QuestionError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub pinnable: Option<bool>,
}

/// `GET /api/users/:id/questions`: render one page of a user's feed.
pub async fn render_feed(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<FeedParams>,
) -> Result<Json<RenderedView>, StatusCode> {
    let mut view = QuestionListView::new(user_id)
        .with_page(params.page.unwrap_or(1))
        .with_pinnable(params.pinnable.unwrap_or(false));
    if let Some(per_page) = params.per_page {
        view = view.with_per_page(per_page).map_err(feed_error_to_status)?;
    }

    let rendered = view
        .render(&*state.questions)
        .await
        .map_err(feed_error_to_status)?;
    Ok(Json(rendered))
}

/// `DELETE /api/questions/:id`: delete a received question and notify
/// every connected page.
pub async fn destroy_question_rest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(question_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let ctx = state.feed_context(Some(&auth.principal), Audience::All);
    let deleted = question_list::destroy_question(&ctx, &question_id)
        .await
        .map_err(feed_error_to_status)?;

    info!(question_id = %deleted.id, user_id = auth.principal.user_id, "question deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn feed_error_to_status(err: FeedError) -> StatusCode {
    match err {
        FeedError::Question(QuestionError::UserNotFound(_) | QuestionError::QuestionNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        FeedError::Question(QuestionError::Database(e)) => {
            tracing::error!(error = %e, "question store failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        FeedError::Forbidden { .. } => StatusCode::FORBIDDEN,
        FeedError::LockedProperty(_)
        | FeedError::InvalidProperty { .. }
        | FeedError::UnknownProperty(_)
        | FeedError::MissingPayload(_)
        | FeedError::UnknownEvent(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
#[path = "questions_test.rs"]
mod tests;
