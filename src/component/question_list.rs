//! Question list: the "answered questions received by a user" feed.
//!
//! DESIGN
//! ======
//! A `QuestionListView` is the per-instance view state: which user the feed
//! belongs to, how many rows to show, which simple-pagination page is
//! active, and whether pinned labels are surfaced. Every operation runs to
//! completion against collaborators passed in through `FeedContext`; the
//! view keeps no handles of its own.
//!
//! `user_id` is set once at construction. There is no setter, and the
//! property-update path rejects it.
//!
//! EVENTS
//! ======
//! `LISTENERS` is the dispatch table from bus topic to handler. Any handled
//! event leaves the view ready for a re-render; `refresh` exists only to be
//! that trigger.

use serde::Serialize;
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame};
use crate::services::bus::{
    Audience, EventBus, QUESTION_CREATED, QUESTION_DESTROY, QUESTION_DESTROYED, QUESTION_REPORTED, QUESTION_UPDATED,
};
use crate::services::policy::{Ability, Principal, QuestionPolicy};
use crate::services::question::{self, PageRequest, Question, QuestionError, QuestionStore, SimplePage, User};

pub const DEFAULT_PER_PAGE: u32 = 5;
pub const PER_PAGE_STEP: u32 = 5;
pub const MAX_PER_PAGE: u32 = 100;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error("not authorized to {ability} question {question_id}")]
    Forbidden { ability: &'static str, question_id: Uuid },
    #[error("property is locked: {0}")]
    LockedProperty(String),
    #[error("invalid value for {property}: {reason}")]
    InvalidProperty { property: String, reason: String },
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    #[error("missing event payload field: {0}")]
    MissingPayload(&'static str),
    #[error("no listener for event: {0}")]
    UnknownEvent(String),
}

impl ErrorCode for FeedError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Question(e) => e.error_code(),
            Self::Forbidden { .. } => "E_FORBIDDEN",
            Self::LockedProperty(_) => "E_LOCKED_PROPERTY",
            Self::InvalidProperty { .. } => "E_INVALID_PROPERTY",
            Self::UnknownProperty(_) => "E_UNKNOWN_PROPERTY",
            Self::MissingPayload(_) => "E_MISSING_PAYLOAD",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
        }
    }
}

/// Handler bound to a bus topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    Refresh,
    Destroy,
}

/// Collaborators for one invocation. `audience` scopes what the component
/// publishes (the page it lives on, or everyone).
pub struct FeedContext<'a> {
    pub store: &'a dyn QuestionStore,
    pub policy: &'a dyn QuestionPolicy,
    pub bus: &'a EventBus,
    pub principal: Option<&'a Principal>,
    pub audience: Audience,
}

/// View model handed to whatever draws the feed.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedView {
    pub user: User,
    pub questions: SimplePage<Question>,
    pub pinnable: bool,
    /// Whether a "load more" control makes sense for this page.
    pub can_load_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionListView {
    user_id: i64,
    per_page: u32,
    page: u32,
    pinnable: bool,
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl QuestionListView {
    pub const LISTENERS: &'static [(&'static str, Listener)] = &[
        (QUESTION_CREATED, Listener::Refresh),
        (QUESTION_UPDATED, Listener::Refresh),
        (QUESTION_REPORTED, Listener::Refresh),
        (QUESTION_DESTROY, Listener::Destroy),
    ];

    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self { user_id, per_page: DEFAULT_PER_PAGE, page: 1, pinnable: false }
    }

    /// Start from a caller-chosen page size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProperty` if `per_page` is outside `5..=100` or not a
    /// multiple of 5.
    pub fn with_per_page(mut self, per_page: u32) -> Result<Self, FeedError> {
        self.per_page = validate_per_page(per_page)?;
        Ok(self)
    }

    /// Start on a given simple-pagination page (1-based, floored at 1).
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    #[must_use]
    pub fn with_pinnable(mut self, pinnable: bool) -> Self {
        self.pinnable = pinnable;
        self
    }

    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn pinnable(&self) -> bool {
        self.pinnable
    }

    /// Topics this view subscribes to.
    #[must_use]
    pub fn topics() -> Vec<&'static str> {
        Self::LISTENERS.iter().map(|(topic, _)| *topic).collect()
    }

    #[must_use]
    pub fn listener_for(topic: &str) -> Option<Listener> {
        Self::LISTENERS
            .iter()
            .find(|(t, _)| *t == topic)
            .map(|(_, listener)| *listener)
    }
}

fn validate_per_page(per_page: u32) -> Result<u32, FeedError> {
    if !(DEFAULT_PER_PAGE..=MAX_PER_PAGE).contains(&per_page) {
        return Err(FeedError::InvalidProperty {
            property: "per_page".into(),
            reason: format!("must be between {DEFAULT_PER_PAGE} and {MAX_PER_PAGE}"),
        });
    }
    if per_page % PER_PAGE_STEP != 0 {
        return Err(FeedError::InvalidProperty {
            property: "per_page".into(),
            reason: format!("must be a multiple of {PER_PAGE_STEP}"),
        });
    }
    Ok(per_page)
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl QuestionListView {
    /// Load the user and the current page of their feed.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user is gone; store errors pass through.
    pub async fn render(&self, store: &dyn QuestionStore) -> Result<RenderedView, FeedError> {
        let user = question::find_user_or_fail(store, self.user_id).await?;
        let questions = store
            .received_feed(user.id, PageRequest::new(self.page, self.per_page))
            .await?;
        let can_load_more = questions.has_more && self.per_page < MAX_PER_PAGE;

        Ok(RenderedView { user, questions, pinnable: self.pinnable, can_load_more })
    }

    /// Grow the page by one step, capped at `MAX_PER_PAGE`.
    pub fn load_more(&mut self) {
        self.per_page = (self.per_page + PER_PAGE_STEP).min(MAX_PER_PAGE);
    }

    /// Re-render trigger for lifecycle events. Intentionally empty.
    pub fn refresh(&self) {}

    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Delete a question on behalf of `ctx.principal`, then announce it.
    ///
    /// # Errors
    ///
    /// `QuestionNotFound` or `Forbidden`; in both cases nothing is deleted
    /// and nothing is published.
    pub async fn destroy(&self, ctx: &FeedContext<'_>, question_id: &str) -> Result<(), FeedError> {
        destroy_question(ctx, question_id).await.map(|_| ())
    }

    /// Set a public property from the client side.
    ///
    /// # Errors
    ///
    /// `LockedProperty` for `user_id`, `InvalidProperty` for bad values,
    /// `UnknownProperty` for anything else.
    pub fn set_property(&mut self, property: &str, value: &serde_json::Value) -> Result<(), FeedError> {
        match property {
            "user_id" | "userId" => Err(FeedError::LockedProperty(property.to_owned())),
            "per_page" | "perPage" => {
                let raw = value
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| FeedError::InvalidProperty {
                        property: "per_page".into(),
                        reason: "expected a positive integer".into(),
                    })?;
                self.per_page = validate_per_page(raw)?;
                Ok(())
            }
            "pinnable" => {
                self.pinnable = value.as_bool().ok_or_else(|| FeedError::InvalidProperty {
                    property: "pinnable".into(),
                    reason: "expected a boolean".into(),
                })?;
                Ok(())
            }
            other => Err(FeedError::UnknownProperty(other.to_owned())),
        }
    }

    /// Run the listener bound to `event.event`.
    ///
    /// # Errors
    ///
    /// `UnknownEvent` when no listener is bound, or whatever the listener
    /// returns.
    pub async fn handle(&self, ctx: &FeedContext<'_>, event: &Frame) -> Result<(), FeedError> {
        match Self::listener_for(&event.event) {
            Some(Listener::Refresh) => {
                self.refresh();
                Ok(())
            }
            Some(Listener::Destroy) => {
                let question_id = event
                    .data_str("questionId")
                    .or_else(|| event.data_str("question_id"))
                    .ok_or(FeedError::MissingPayload("questionId"))?;
                self.destroy(ctx, question_id).await
            }
            None => Err(FeedError::UnknownEvent(event.event.clone())),
        }
    }
}

/// Find, authorize, hard-delete, then publish `question.destroyed`.
/// Returns the deleted row.
///
/// # Errors
///
/// `QuestionNotFound`, `Forbidden`, or a store error.
pub async fn destroy_question(ctx: &FeedContext<'_>, question_id: &str) -> Result<Question, FeedError> {
    let question = question::find_question_or_fail(ctx.store, question_id).await?;

    if !ctx.policy.allows(ctx.principal, Ability::Delete, &question) {
        return Err(FeedError::Forbidden { ability: Ability::Delete.as_str(), question_id: question.id });
    }

    // A concurrent delete between lookup and here reads as not found.
    if !ctx.store.delete_question(question.id).await? {
        return Err(QuestionError::QuestionNotFound(question_id.to_owned()).into());
    }

    ctx.bus
        .publish(&Frame::request(QUESTION_DESTROYED, Data::new()), ctx.audience)
        .await;

    Ok(question)
}

#[cfg(test)]
#[path = "question_list_test.rs"]
mod tests;
