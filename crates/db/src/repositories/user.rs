//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};

/// User repository for database operations.
///
/// Methods that take a `conn` run on the caller's connection or transaction.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Current reputation of a user.
    pub async fn reputation_of<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<i32> {
        User::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .map(|u| u.reputation)
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Add `delta` to a user's reputation in a single UPDATE, clamping the
    /// result at zero, and return the new value.
    ///
    /// The clamp is applied after the increment, so a negative delta larger
    /// than the current value is partly lost.
    pub async fn adjust_reputation<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        delta: i32,
    ) -> AppResult<i32> {
        let incremented = Expr::col(user::Column::Reputation).add(delta);
        let clamped = Expr::case(Expr::expr(incremented.clone()).lt(0), Expr::value(0))
            .finally(incremented);

        let result = User::update_many()
            .col_expr(user::Column::Reputation, clamped.into())
            .filter(user::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::UserNotFound(id.to_string()));
        }

        self.reputation_of(conn, id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, reputation: i32) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("{id}_name"),
            role: UserRole::Member,
            reputation,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;

        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "missing"),
            other => panic!("Expected UserNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", 12)]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_id("u1").await.unwrap().unwrap();

        assert_eq!(found.reputation, 12);
    }

    #[tokio::test]
    async fn test_adjust_reputation_returns_new_value() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[create_test_user("u1", 5)]])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let value = repo.adjust_reputation(db.as_ref(), "u1", 5).await.unwrap();

        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_adjust_reputation_unknown_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let result = repo.adjust_reputation(db.as_ref(), "ghost", -2).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }
}
