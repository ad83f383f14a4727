//! Best answer service.

use std::sync::Arc;

use agora_common::{AppError, AppResult};
use agora_db::repositories::{AnswerRepository, QuestionRepository};
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;

use super::{
    hooks::{BestAnswerEvent, VoteHooks},
    reputation::ReputationEngine,
};

/// Result of marking a best answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestAnswerOutcome {
    pub question_id: String,
    pub answer_id: String,
    /// Whether this mark granted the bonus. Only the first mark of an answer does.
    pub granted: bool,
    /// Answer author's reputation after the grant.
    pub author_reputation: Option<i32>,
}

/// Marks best answers and grants the one-time reputation bonus.
#[derive(Clone)]
pub struct BestAnswerService {
    db: Arc<DatabaseConnection>,
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    reputation: ReputationEngine,
    hooks: VoteHooks,
}

impl BestAnswerService {
    /// Create a new best answer service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
        reputation: ReputationEngine,
    ) -> Self {
        Self {
            db,
            question_repo,
            answer_repo,
            reputation,
            hooks: VoteHooks::new(),
        }
    }

    /// Set the hooks notified after each mark.
    pub fn set_hooks(&mut self, hooks: VoteHooks) {
        self.hooks = hooks;
    }

    /// Mark an answer as the best answer on behalf of the question author.
    pub async fn mark_as_author(
        &self,
        actor_id: &str,
        answer_id: &str,
    ) -> AppResult<BestAnswerOutcome> {
        let answer = self.answer_repo.get_by_id(answer_id).await?;
        let question = self.question_repo.get_by_id(&answer.question_id).await?;

        if question.user_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the question author can choose the best answer".to_string(),
            ));
        }

        self.mark_best_answer(answer_id).await
    }

    /// Mark an answer as the best answer of its question.
    ///
    /// The question becomes resolved and points at the answer. The author
    /// gains the best-answer bonus only the first time this answer is marked;
    /// moving the mark elsewhere does not take an earlier bonus back.
    pub async fn mark_best_answer(&self, answer_id: &str) -> AppResult<BestAnswerOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let answer = self
            .answer_repo
            .find_by_id(&txn, answer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Answer {answer_id} not found")))?;

        self.question_repo
            .set_best_answer(&txn, &answer.question_id, &answer.id)
            .await?;

        let granted = if self
            .answer_repo
            .claim_best_answer_award(&txn, &answer.id)
            .await?
        {
            Some(
                self.reputation
                    .grant_best_answer(&txn, &answer.user_id)
                    .await?,
            )
        } else {
            None
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            question_id = %answer.question_id,
            answer_id = %answer.id,
            author_id = %answer.user_id,
            granted = granted.is_some(),
            "Best answer marked"
        );

        let outcome = BestAnswerOutcome {
            question_id: answer.question_id.clone(),
            answer_id: answer.id.clone(),
            granted: granted.is_some(),
            author_reputation: granted.as_ref().map(|g| g.reputation),
        };

        self.hooks
            .dispatch_best_answer(&BestAnswerEvent {
                question_id: answer.question_id,
                answer_id: answer.id,
                author_id: answer.user_id,
                granted,
                occurred_at: Utc::now(),
            })
            .await;

        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::{
        entities::{answer, question},
        repositories::UserRepository,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn answer(awarded: bool) -> answer::Model {
        answer::Model {
            id: "a1".to_string(),
            question_id: "q1".to_string(),
            user_id: "carol".to_string(),
            body: "Use a Mutex.".to_string(),
            best_answer_awarded: awarded,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> BestAnswerService {
        let db = Arc::new(db.into_connection());
        BestAnswerService::new(
            db.clone(),
            QuestionRepository::new(db.clone()),
            AnswerRepository::new(db.clone()),
            ReputationEngine::new(UserRepository::new(db.clone())),
        )
    }

    #[tokio::test]
    async fn test_remark_grants_nothing() {
        // The award flag is already set: the claim matches zero rows and no
        // reputation write is mocked.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[answer(true)]])
            .append_exec_results([exec(1), exec(0)]);

        let outcome = service(db).mark_best_answer("a1").await.unwrap();

        assert!(!outcome.granted);
        assert_eq!(outcome.author_reputation, None);
        assert_eq!(outcome.question_id, "q1");
    }

    #[tokio::test]
    async fn test_missing_answer() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<answer::Model>::new()]);

        let result = service(db).mark_best_answer("a404").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_only_question_author_may_mark() {
        let question = question::Model {
            id: "q1".to_string(),
            user_id: "alice".to_string(),
            title: "Locks?".to_string(),
            body: "Which one?".to_string(),
            status: question::QuestionStatus::Open,
            best_answer_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[answer(false)]])
            .append_query_results([[question]]);

        let result = service(db).mark_as_author("mallory", "a1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
