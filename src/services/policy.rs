//! Authorization policy for question actions.
//!
//! The acting principal is always passed in explicitly. A `None` principal
//! is a guest and is denied every ability by the default policy.

use crate::services::question::Question;

/// Identity on whose behalf an authorization check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    Delete,
}

impl Ability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
        }
    }
}

/// Allow/deny decision for `(principal, ability, question)`.
pub trait QuestionPolicy: Send + Sync {
    fn allows(&self, principal: Option<&Principal>, ability: Ability, question: &Question) -> bool;
}

/// Only the recipient of a question may delete it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipientPolicy;

impl QuestionPolicy for RecipientPolicy {
    fn allows(&self, principal: Option<&Principal>, ability: Ability, question: &Question) -> bool {
        let Some(principal) = principal else {
            return false;
        };
        match ability {
            Ability::Delete => principal.user_id == question.to_id,
        }
    }
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
