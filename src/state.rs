//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool (sessions), the question store and policy the
//! feed component runs against, and the event bus every mounted component
//! subscribes to.

use std::sync::Arc;

use sqlx::PgPool;

use crate::component::question_list::FeedContext;
use crate::services::bus::{Audience, EventBus};
use crate::services::policy::{Principal, QuestionPolicy, RecipientPolicy};
use crate::services::question::{PgQuestionStore, QuestionStore};

pub const DEFAULT_WS_CHANNEL_CAPACITY: usize = 256;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub questions: Arc<dyn QuestionStore>,
    pub policy: Arc<dyn QuestionPolicy>,
    pub bus: EventBus,
    /// Buffer size of each websocket client's outbound channel.
    pub ws_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, questions: Arc<dyn QuestionStore>, policy: Arc<dyn QuestionPolicy>) -> Self {
        Self { pool, questions, policy, bus: EventBus::new(), ws_channel_capacity: DEFAULT_WS_CHANNEL_CAPACITY }
    }

    /// Production wiring: Postgres-backed store, recipient-only deletes.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        let questions = Arc::new(PgQuestionStore::new(pool.clone()));
        Self::new(pool, questions, Arc::new(RecipientPolicy))
    }

    #[must_use]
    pub fn with_ws_channel_capacity(mut self, capacity: usize) -> Self {
        self.ws_channel_capacity = capacity.max(1);
        self
    }

    /// Borrow the collaborators a feed operation needs.
    #[must_use]
    pub fn feed_context<'a>(&'a self, principal: Option<&'a Principal>, audience: Audience) -> FeedContext<'a> {
        FeedContext {
            store: &*self.questions,
            policy: &*self.policy,
            bus: &self.bus,
            principal,
            audience,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
