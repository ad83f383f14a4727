//! Content lifecycle service.
//!
//! Deleting a question or answer also deletes the votes and reports that
//! point at it. Votes carry no foreign key (the target is polymorphic), so
//! the cleanup happens here, in the same transaction as the delete.

use std::sync::Arc;

use agora_common::{AppError, AppResult};
use agora_db::{
    entities::Target,
    repositories::{AnswerRepository, QuestionRepository, ReportRepository, VoteRepository},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;

/// What a cascade delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub answers_removed: u64,
    pub votes_removed: u64,
    pub reports_removed: u64,
}

/// Deletes questions and answers together with their dependents.
///
/// Reputation earned from the removed votes is kept: removing content is not
/// a voter retracting a vote.
#[derive(Clone)]
pub struct ContentService {
    db: Arc<DatabaseConnection>,
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    vote_repo: VoteRepository,
    report_repo: ReportRepository,
}

impl ContentService {
    /// Create a new content service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
        vote_repo: VoteRepository,
        report_repo: ReportRepository,
    ) -> Self {
        Self {
            db,
            question_repo,
            answer_repo,
            vote_repo,
            report_repo,
        }
    }

    /// Delete a question, its answers, and every vote and report on them.
    pub async fn delete_question(&self, question_id: &str) -> AppResult<CascadeSummary> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if self
            .question_repo
            .find_by_id(&txn, question_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Question {question_id} not found"
            )));
        }

        let mut summary = CascadeSummary::default();

        for answer_id in self
            .answer_repo
            .find_ids_by_question(&txn, question_id)
            .await?
        {
            self.purge_target(&txn, &Target::answer(answer_id.as_str()), &mut summary)
                .await?;
            if self.answer_repo.delete(&txn, &answer_id).await? {
                summary.answers_removed += 1;
            }
        }

        self.purge_target(&txn, &Target::question(question_id), &mut summary)
            .await?;
        self.question_repo.delete(&txn, question_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            question_id = %question_id,
            answers = summary.answers_removed,
            votes = summary.votes_removed,
            reports = summary.reports_removed,
            "Question deleted"
        );

        Ok(summary)
    }

    /// Delete an answer and every vote and report on it.
    ///
    /// If the answer was its question's best answer, the question is reopened.
    pub async fn delete_answer(&self, answer_id: &str) -> AppResult<CascadeSummary> {
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

        let reopened = self
            .question_repo
            .clear_best_answer(&txn, &answer.question_id, &answer.id)
            .await?;

        let mut summary = CascadeSummary {
            answers_removed: 1,
            ..Default::default()
        };
        self.purge_target(&txn, &Target::answer(answer.id.as_str()), &mut summary)
            .await?;
        self.answer_repo.delete(&txn, &answer.id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            answer_id = %answer.id,
            question_id = %answer.question_id,
            reopened,
            votes = summary.votes_removed,
            reports = summary.reports_removed,
            "Answer deleted"
        );

        Ok(summary)
    }

    async fn purge_target<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &Target,
        summary: &mut CascadeSummary,
    ) -> AppResult<()> {
        summary.votes_removed += self.vote_repo.delete_by_target(conn, target).await?;
        summary.reports_removed += self.report_repo.delete_by_target(conn, target).await?;
        Ok(())
    }
}
