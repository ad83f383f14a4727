//! Question repository.

use std::sync::Arc;

use crate::entities::{
    Question,
    question::{self, QuestionStatus},
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(self.db.as_ref(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {id} not found")))
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Point the question at its best answer and mark it resolved.
    pub async fn set_best_answer<C: ConnectionTrait>(
        &self,
        conn: &C,
        question_id: &str,
        answer_id: &str,
    ) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        Question::update_many()
            .col_expr(question::Column::BestAnswerId, Expr::value(answer_id))
            .col_expr(question::Column::Status, Expr::value(QuestionStatus::Resolved))
            .col_expr(question::Column::UpdatedAt, Expr::value(now))
            .filter(question::Column::Id.eq(question_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Clear the best answer if it is `answer_id`, reopening the question.
    pub async fn clear_best_answer<C: ConnectionTrait>(
        &self,
        conn: &C,
        question_id: &str,
        answer_id: &str,
    ) -> AppResult<bool> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let result = Question::update_many()
            .col_expr(
                question::Column::BestAnswerId,
                Expr::value(Option::<String>::None),
            )
            .col_expr(question::Column::Status, Expr::value(QuestionStatus::Open))
            .col_expr(question::Column::UpdatedAt, Expr::value(now))
            .filter(question::Column::Id.eq(question_id))
            .filter(question::Column::BestAnswerId.eq(answer_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete a question. Answers go with it through the foreign key.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<bool> {
        let result = Question::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}
