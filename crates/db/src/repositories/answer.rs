//! Answer repository.

use std::sync::Arc;

use crate::entities::{Answer, answer};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Answer repository for database operations.
#[derive(Clone)]
pub struct AnswerRepository {
    db: Arc<DatabaseConnection>,
}

impl AnswerRepository {
    /// Create a new answer repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an answer by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<answer::Model>> {
        Answer::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an answer by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<answer::Model> {
        self.find_by_id(self.db.as_ref(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Answer {id} not found")))
    }

    /// Create a new answer.
    pub async fn create(&self, model: answer::ActiveModel) -> AppResult<answer::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every answer to a question.
    pub async fn find_ids_by_question<C: ConnectionTrait>(
        &self,
        conn: &C,
        question_id: &str,
    ) -> AppResult<Vec<String>> {
        Answer::find()
            .select_only()
            .column(answer::Column::Id)
            .filter(answer::Column::QuestionId.eq(question_id))
            .order_by_asc(answer::Column::Id)
            .into_tuple::<String>()
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Flip `best_answer_awarded` from false to true.
    ///
    /// Returns `true` only for the caller that performed the flip, so the
    /// best-answer grant is applied once even under concurrent marking.
    pub async fn claim_best_answer_award<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<bool> {
        let result = Answer::update_many()
            .col_expr(answer::Column::BestAnswerAwarded, Expr::value(true))
            .filter(answer::Column::Id.eq(id))
            .filter(answer::Column::BestAnswerAwarded.eq(false))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected == 1)
    }

    /// Delete an answer.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<bool> {
        let result = Answer::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_answer(id: &str, question_id: &str, user_id: &str) -> answer::Model {
        answer::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            user_id: user_id.to_string(),
            body: "Use a borrow".to_string(),
            best_answer_awarded: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_answer("a1", "q1", "u2")]])
                .into_connection(),
        );

        let repo = AnswerRepository::new(db);
        let found = repo.get_by_id("a1").await.unwrap();

        assert_eq!(found.question_id, "q1");
        assert!(!found.best_answer_awarded);
    }

    #[tokio::test]
    async fn test_claim_award_once() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = AnswerRepository::new(db.clone());
        assert!(repo.claim_best_answer_award(db.as_ref(), "a1").await.unwrap());
        assert!(!repo.claim_best_answer_award(db.as_ref(), "a1").await.unwrap());
    }
}
