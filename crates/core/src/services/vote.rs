//! Vote ledger service.
//!
//! Holds at most one vote per (voter, target). A submission is classified
//! against the stored row:
//!
//! | stored | requested | result                 |
//! |--------|-----------|------------------------|
//! | none   | v         | `Created(v)`           |
//! | v      | v         | `Removed(v)` (toggle)  |
//! | v      | -v        | `Updated(v -> -v)`     |
//!
//! Every write is conditional on the state that was read, and the ledger
//! write plus the reputation delta share one transaction. Hooks run after
//! commit.

use std::sync::Arc;

use agora_common::{AppError, AppResult, IdGenerator, LedgerConfig};
use agora_db::{
    entities::{
        Target,
        vote::{self, VoteValue},
    },
    repositories::VoteRepository,
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use serde::Serialize;

use super::{
    hooks::{VoteEvent, VoteHooks},
    reputation::{ReputationChange, ReputationEngine, VoteAction, VoteTransition},
    target::{TargetRegistry, parse_target, parse_vote_value},
};

/// Maximum page size for vote listings.
const MAX_PAGE_SIZE: u64 = 100;

/// Result of a vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub action: VoteAction,
    /// The caller's vote after the submission.
    pub current_value: Option<VoteValue>,
    /// `None` when the submission coalesced with a concurrent twin.
    #[serde(skip)]
    pub transition: Option<VoteTransition>,
}

/// Aggregate votes on a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStats {
    pub positive: u64,
    pub negative: u64,
    /// `positive - negative`
    pub score: i64,
    /// The caller's own vote, when a caller was given.
    pub user_vote: Option<VoteValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Cast(VoteValue),
    Retract,
}

/// Next ledger write for an observed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerStep {
    Insert(VoteValue),
    Update { from: VoteValue, to: VoteValue },
    Delete(VoteValue),
    /// Nothing to write.
    Skip,
}

/// Decide the ledger write for `intent` given the stored value.
///
/// `after_conflict` is set once our insert lost to a concurrent insert for
/// the same pair. A stored row equal to the request is then the twin of this
/// request, not an earlier vote, so it must not be toggled off.
fn classify(stored: Option<VoteValue>, intent: Intent, after_conflict: bool) -> LedgerStep {
    match (intent, stored) {
        (Intent::Cast(value), None) => LedgerStep::Insert(value),
        (Intent::Cast(value), Some(current)) if current == value => {
            if after_conflict {
                LedgerStep::Skip
            } else {
                LedgerStep::Delete(current)
            }
        }
        (Intent::Cast(value), Some(current)) => LedgerStep::Update {
            from: current,
            to: value,
        },
        (Intent::Retract, Some(current)) => LedgerStep::Delete(current),
        (Intent::Retract, None) => LedgerStep::Skip,
    }
}

/// A ledger change that was committed.
struct Committed {
    vote_id: String,
    author_id: String,
    transition: VoteTransition,
    reputation: Option<ReputationChange>,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    db: Arc<DatabaseConnection>,
    vote_repo: VoteRepository,
    registry: TargetRegistry,
    reputation: ReputationEngine,
    hooks: VoteHooks,
    max_attempts: u32,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        vote_repo: VoteRepository,
        registry: TargetRegistry,
        reputation: ReputationEngine,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            db,
            vote_repo,
            registry,
            reputation,
            hooks: VoteHooks::new(),
            max_attempts: config.max_attempts.max(1),
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the hooks notified after each committed transition.
    pub fn set_hooks(&mut self, hooks: VoteHooks) {
        self.hooks = hooks;
    }

    /// Submit a vote from untyped input.
    ///
    /// `kind` must name a known target kind and `value` must be 1 or -1.
    pub async fn submit_vote(
        &self,
        voter_id: &str,
        kind: &str,
        target_id: &str,
        value: i64,
    ) -> AppResult<VoteOutcome> {
        let target = parse_target(kind, target_id)?;
        let value = parse_vote_value(value)?;
        self.cast(voter_id, &target, value).await
    }

    /// Cast, toggle off or flip a vote.
    pub async fn cast(
        &self,
        voter_id: &str,
        target: &Target,
        value: VoteValue,
    ) -> AppResult<VoteOutcome> {
        let committed = self.commit(voter_id, target, Intent::Cast(value)).await?;

        Ok(match committed {
            Some(c) => VoteOutcome {
                action: c.transition.action(),
                current_value: c.transition.current_value(),
                transition: Some(c.transition),
            },
            // Coalesced with a concurrent identical submission.
            None => VoteOutcome {
                action: VoteAction::Created,
                current_value: Some(value),
                transition: None,
            },
        })
    }

    /// Remove the caller's vote on a target, if any.
    ///
    /// Returns the removed value.
    pub async fn retract(&self, voter_id: &str, target: &Target) -> AppResult<Option<VoteValue>> {
        let committed = self.commit(voter_id, target, Intent::Retract).await?;

        Ok(committed.and_then(|c| match c.transition {
            VoteTransition::Removed { old } => Some(old),
            _ => None,
        }))
    }

    /// The caller's vote on a target.
    pub async fn get_user_vote(
        &self,
        voter_id: &str,
        target: &Target,
    ) -> AppResult<Option<VoteValue>> {
        let row = self
            .vote_repo
            .find_for_voter(self.db.as_ref(), voter_id, target)
            .await?;
        Ok(row.and_then(|v| v.vote_value()))
    }

    /// Vote counts on a target, plus the caller's vote.
    pub async fn get_vote_stats(
        &self,
        target: &Target,
        caller_id: Option<&str>,
    ) -> AppResult<VoteStats> {
        self.registry.resolve(self.db.as_ref(), target).await?;

        let positive = self.vote_repo.count_by_value(target, VoteValue::Up).await?;
        let negative = self
            .vote_repo
            .count_by_value(target, VoteValue::Down)
            .await?;

        let user_vote = match caller_id {
            Some(id) => self.get_user_vote(id, target).await?,
            None => None,
        };

        Ok(VoteStats {
            positive,
            negative,
            score: positive as i64 - negative as i64,
            user_vote,
        })
    }

    /// Votes on a target, newest first.
    pub async fn list_votes(
        &self,
        target: &Target,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.vote_repo
            .find_by_target(target, limit.clamp(1, MAX_PAGE_SIZE), until_id)
            .await
    }

    /// Votes cast by a user, newest first.
    pub async fn list_user_votes(
        &self,
        voter_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.vote_repo
            .find_by_user(voter_id, limit.clamp(1, MAX_PAGE_SIZE), until_id)
            .await
    }

    /// Apply an intent in one transaction, then notify hooks.
    async fn commit(
        &self,
        voter_id: &str,
        target: &Target,
        intent: Intent,
    ) -> AppResult<Option<Committed>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let resolved = self.registry.resolve(&txn, target).await?;
        if matches!(intent, Intent::Cast(_)) && resolved.owner_id == voter_id {
            return Err(AppError::SelfVote);
        }

        let Some((vote_id, transition)) = self.write_ledger(&txn, voter_id, target, intent).await?
        else {
            txn.commit()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(None);
        };

        let reputation = self
            .reputation
            .apply_vote(&txn, &resolved.owner_id, voter_id, &transition)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            vote_id = %vote_id,
            voter_id = %voter_id,
            target_kind = %target.kind,
            target_id = %target.id,
            action = ?transition.action(),
            delta = reputation.as_ref().map(|r| r.delta),
            "Vote committed"
        );

        let committed = Committed {
            vote_id,
            author_id: resolved.owner_id,
            transition,
            reputation,
        };

        self.hooks
            .dispatch_vote(&VoteEvent {
                vote_id: committed.vote_id.clone(),
                voter_id: voter_id.to_string(),
                target: target.clone(),
                author_id: committed.author_id.clone(),
                transition: committed.transition,
                reputation: committed.reputation.clone(),
                occurred_at: Utc::now(),
            })
            .await;

        Ok(Some(committed))
    }

    /// Classify and write until a conditional write lands.
    ///
    /// Returns the affected row id and transition, or `None` when nothing
    /// had to be written.
    async fn write_ledger<C: ConnectionTrait>(
        &self,
        conn: &C,
        voter_id: &str,
        target: &Target,
        intent: Intent,
    ) -> AppResult<Option<(String, VoteTransition)>> {
        let mut after_conflict = false;

        for attempt in 1..=self.max_attempts {
            let stored = self.vote_repo.find_for_voter(conn, voter_id, target).await?;
            let stored_value = match &stored {
                Some(row) => Some(row.vote_value().ok_or_else(|| {
                    AppError::Internal(format!("vote {} holds invalid value {}", row.id, row.value))
                })?),
                None => None,
            };

            let step = classify(stored_value, intent, after_conflict);
            tracing::debug!(
                attempt,
                voter_id = %voter_id,
                target = %target,
                stored = ?stored_value,
                step = ?step,
                "Classified vote"
            );

            match (step, stored) {
                (LedgerStep::Insert(value), _) => {
                    let id = self.id_gen.generate();
                    let now: DateTimeWithTimeZone = Utc::now().into();
                    let model = vote::ActiveModel {
                        id: Set(id.clone()),
                        user_id: Set(voter_id.to_string()),
                        target_kind: Set(target.kind),
                        target_id: Set(target.id.clone()),
                        value: Set(value.as_i16()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    if self.vote_repo.insert_if_absent(conn, model).await? {
                        return Ok(Some((id, VoteTransition::Created { value })));
                    }
                    tracing::debug!(attempt, voter_id = %voter_id, "Concurrent vote insert, retrying as update");
                    after_conflict = true;
                }
                (LedgerStep::Update { from, to }, Some(row)) => {
                    if self
                        .vote_repo
                        .update_value_if(conn, &row.id, from, to)
                        .await?
                    {
                        return Ok(Some((row.id, VoteTransition::Updated { old: from, new: to })));
                    }
                    tracing::debug!(attempt, vote_id = %row.id, "Vote changed concurrently, re-reading");
                }
                (LedgerStep::Delete(old), Some(row)) => {
                    if self.vote_repo.delete_if(conn, &row.id, old).await? {
                        return Ok(Some((row.id, VoteTransition::Removed { old })));
                    }
                    tracing::debug!(attempt, vote_id = %row.id, "Vote changed concurrently, re-reading");
                }
                (LedgerStep::Skip, _) => return Ok(None),
                // Update and Delete are only classified from a stored row.
                (LedgerStep::Update { .. } | LedgerStep::Delete(_), None) => {
                    return Err(AppError::Internal(
                        "vote classified against a missing row".to_string(),
                    ));
                }
            }
        }

        tracing::warn!(
            voter_id = %voter_id,
            target = %target,
            attempts = self.max_attempts,
            "Vote ledger contention, giving up"
        );
        Err(AppError::Database(format!(
            "vote on {target} kept changing concurrently; retry the request"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::{
        entities::{TargetKind, question, user},
        repositories::{AnswerRepository, QuestionRepository, UserRepository},
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    const UP: VoteValue = VoteValue::Up;
    const DOWN: VoteValue = VoteValue::Down;

    #[test]
    fn test_classify_cast() {
        assert_eq!(classify(None, Intent::Cast(UP), false), LedgerStep::Insert(UP));
        assert_eq!(classify(Some(UP), Intent::Cast(UP), false), LedgerStep::Delete(UP));
        assert_eq!(
            classify(Some(UP), Intent::Cast(DOWN), false),
            LedgerStep::Update { from: UP, to: DOWN }
        );
    }

    #[test]
    fn test_classify_after_conflict_coalesces_twin() {
        assert_eq!(classify(Some(DOWN), Intent::Cast(DOWN), true), LedgerStep::Skip);
        assert_eq!(
            classify(Some(DOWN), Intent::Cast(UP), true),
            LedgerStep::Update { from: DOWN, to: UP }
        );
        assert_eq!(classify(None, Intent::Cast(UP), true), LedgerStep::Insert(UP));
    }

    #[test]
    fn test_classify_retract() {
        assert_eq!(classify(Some(DOWN), Intent::Retract, false), LedgerStep::Delete(DOWN));
        assert_eq!(classify(None, Intent::Retract, false), LedgerStep::Skip);
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn question_by(owner: &str) -> question::Model {
        question::Model {
            id: "q1".to_string(),
            user_id: owner.to_string(),
            title: "Why?".to_string(),
            body: "Because.".to_string(),
            status: question::QuestionStatus::Open,
            best_answer_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn vote_row(voter: &str, value: VoteValue) -> vote::Model {
        vote::Model {
            id: "v1".to_string(),
            user_id: voter.to_string(),
            target_kind: TargetKind::Question,
            target_id: "q1".to_string(),
            value: value.as_i16(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn author(reputation: i32) -> user::Model {
        user::Model {
            id: "alice".to_string(),
            username: "alice".to_string(),
            role: user::UserRole::Member,
            reputation,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase, max_attempts: u32) -> VoteService {
        let db = Arc::new(db.into_connection());
        VoteService::new(
            db.clone(),
            VoteRepository::new(db.clone()),
            TargetRegistry::new(
                QuestionRepository::new(db.clone()),
                AnswerRepository::new(db.clone()),
            ),
            ReputationEngine::new(UserRepository::new(db.clone())),
            &LedgerConfig { max_attempts },
        )
    }

    #[tokio::test]
    async fn test_self_vote_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[question_by("bob")]]);

        let result = service(db, 3).cast("bob", &Target::question("q1"), UP).await;

        assert!(matches!(result, Err(AppError::SelfVote)));
    }

    #[tokio::test]
    async fn test_lost_insert_race_with_same_value_coalesces() {
        // Our read sees no vote, the insert hits the twin's row, the re-read
        // finds the twin. No reputation query is mocked, so any delta would
        // fail the test.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[question_by("alice")]])
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec(0)])
            .append_query_results([[vote_row("bob", UP)]]);

        let outcome = service(db, 3)
            .cast("bob", &Target::question("q1"), UP)
            .await
            .unwrap();

        assert_eq!(outcome.action, VoteAction::Created);
        assert_eq!(outcome.current_value, Some(UP));
        assert_eq!(outcome.transition, None);
    }

    #[tokio::test]
    async fn test_failed_update_reclassifies() {
        // Stored Up, flip to Down loses because the row vanished, second pass
        // inserts Down.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[question_by("alice")]])
            .append_query_results([[vote_row("bob", UP)]])
            .append_query_results([Vec::<vote::Model>::new()])
            .append_query_results([[author(8)]])
            .append_exec_results([exec(0), exec(1), exec(1)]);

        let outcome = service(db, 3)
            .cast("bob", &Target::question("q1"), DOWN)
            .await
            .unwrap();

        assert_eq!(outcome.action, VoteAction::Created);
        assert_eq!(outcome.transition, Some(VoteTransition::Created { value: DOWN }));
    }

    #[tokio::test]
    async fn test_contention_exhausts_attempts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[question_by("alice")]])
            .append_query_results([[vote_row("bob", UP)]])
            .append_exec_results([exec(0)]);

        let result = service(db, 1)
            .cast("bob", &Target::question("q1"), DOWN)
            .await;

        match result {
            Err(e @ AppError::Database(_)) => assert!(e.is_transient()),
            other => panic!("expected transient error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_vote_validates_input() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), 3);

        assert!(matches!(
            svc.submit_vote("bob", "question", "q1", 0).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            svc.submit_vote("bob", "comment", "c1", 1).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = VoteOutcome {
            action: VoteAction::Updated,
            current_value: Some(DOWN),
            transition: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"action": "updated", "currentValue": -1}));
    }
}
