//! Reputation engine.
//!
//! Turns vote lifecycle transitions and best-answer marks into reputation
//! deltas for the content author. Deltas are applied through a single clamped
//! UPDATE on the caller's transaction, so the ledger row and the counter move
//! together or not at all.

use agora_common::AppResult;
use agora_db::{entities::vote::VoteValue, repositories::UserRepository};
use sea_orm::ConnectionTrait;
use serde::Serialize;

/// Outcome class of a vote submission, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Created,
    Updated,
    Removed,
}

/// Classified change to the vote ledger for one (voter, target) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No vote existed; one was inserted.
    Created { value: VoteValue },
    /// The voter switched direction.
    Updated { old: VoteValue, new: VoteValue },
    /// The voter repeated their vote (or retracted it); the row is gone.
    Removed { old: VoteValue },
}

impl VoteTransition {
    /// Caller-facing action for this transition.
    #[must_use]
    pub const fn action(&self) -> VoteAction {
        match self {
            Self::Created { .. } => VoteAction::Created,
            Self::Updated { .. } => VoteAction::Updated,
            Self::Removed { .. } => VoteAction::Removed,
        }
    }

    /// Value the ledger holds after the transition.
    #[must_use]
    pub const fn current_value(&self) -> Option<VoteValue> {
        match self {
            Self::Created { value } => Some(*value),
            Self::Updated { new, .. } => Some(*new),
            Self::Removed { .. } => None,
        }
    }
}

/// Point values for reputation-bearing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationPolicy {
    pub upvote: i32,
    pub downvote: i32,
    pub best_answer: i32,
}

impl ReputationPolicy {
    /// Upvote +5, downvote -2, best answer +10.
    pub const STANDARD: Self = Self {
        upvote: 5,
        downvote: -2,
        best_answer: 10,
    };

    /// Points a standing vote is worth to the author.
    #[must_use]
    pub const fn points_for(&self, value: VoteValue) -> i32 {
        match value {
            VoteValue::Up => self.upvote,
            VoteValue::Down => self.downvote,
        }
    }

    /// Reputation delta for a transition.
    ///
    /// An update is computed as one step (new minus old) rather than a
    /// removal followed by a creation, so the clamp at zero is applied once.
    #[must_use]
    pub const fn delta_for(&self, transition: &VoteTransition) -> i32 {
        match transition {
            VoteTransition::Created { value } => self.points_for(*value),
            VoteTransition::Updated { old, new } => self.points_for(*new) - self.points_for(*old),
            VoteTransition::Removed { old } => -self.points_for(*old),
        }
    }
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A reputation adjustment that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReputationChange {
    pub user_id: String,
    pub delta: i32,
    /// Reputation after the delta and the clamp.
    pub reputation: i32,
}

/// Applies reputation deltas to users.
#[derive(Clone)]
pub struct ReputationEngine {
    user_repo: UserRepository,
    policy: ReputationPolicy,
}

impl ReputationEngine {
    /// Create an engine with the standard point values.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            policy: ReputationPolicy::STANDARD,
        }
    }

    /// Apply the reputation effect of a vote transition to the target author.
    ///
    /// Returns `None` when nothing was written: the voter is the author, or
    /// the delta is zero.
    pub async fn apply_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
        voter_id: &str,
        transition: &VoteTransition,
    ) -> AppResult<Option<ReputationChange>> {
        if author_id == voter_id {
            tracing::warn!(
                user_id = %author_id,
                "Self-vote reached the reputation engine; ignoring"
            );
            return Ok(None);
        }

        let delta = self.policy.delta_for(transition);
        if delta == 0 {
            return Ok(None);
        }

        self.adjust(conn, author_id, delta).await.map(Some)
    }

    /// Grant the best-answer bonus to an answer's author.
    pub async fn grant_best_answer<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
    ) -> AppResult<ReputationChange> {
        self.adjust(conn, author_id, self.policy.best_answer).await
    }

    async fn adjust<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        delta: i32,
    ) -> AppResult<ReputationChange> {
        let reputation = self
            .user_repo
            .adjust_reputation(conn, user_id, delta)
            .await?;

        tracing::debug!(user_id = %user_id, delta, reputation, "Adjusted reputation");

        Ok(ReputationChange {
            user_id: user_id.to_string(),
            delta,
            reputation,
        })
    }
}
