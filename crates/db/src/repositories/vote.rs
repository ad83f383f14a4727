//! Vote repository.

use std::sync::Arc;

use crate::entities::{
    Target, Vote,
    vote::{self, VoteValue},
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, OnConflict},
};

/// Vote repository for database operations.
///
/// Every write is conditional so the ledger can detect that it lost a race:
/// inserts skip on the `(user_id, target_kind, target_id)` unique index, and
/// updates/deletes only match the value the caller last observed.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote a user cast on a target.
    pub async fn find_for_voter<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        target: &Target,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::TargetKind.eq(target.kind))
            .filter(vote::Column::TargetId.eq(target.id.as_str()))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a vote unless one already exists for the same voter and target.
    ///
    /// Returns `false` when the unique index rejected the row. The statement
    /// uses `ON CONFLICT DO NOTHING` so the surrounding transaction stays
    /// usable for the re-read that follows.
    pub async fn insert_if_absent<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: vote::ActiveModel,
    ) -> AppResult<bool> {
        let rows = Vote::insert(model)
            .on_conflict(
                OnConflict::columns([
                    vote::Column::UserId,
                    vote::Column::TargetKind,
                    vote::Column::TargetId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows == 1)
    }

    /// Change a vote's value if it still holds `expected`.
    pub async fn update_value_if<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        expected: VoteValue,
        value: VoteValue,
    ) -> AppResult<bool> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        let result = Vote::update_many()
            .col_expr(vote::Column::Value, Expr::value(value.as_i16()))
            .col_expr(vote::Column::UpdatedAt, Expr::value(now))
            .filter(vote::Column::Id.eq(id))
            .filter(vote::Column::Value.eq(expected.as_i16()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected == 1)
    }

    /// Delete a vote if it still holds `expected`.
    pub async fn delete_if<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        expected: VoteValue,
    ) -> AppResult<bool> {
        let result = Vote::delete_many()
            .filter(vote::Column::Id.eq(id))
            .filter(vote::Column::Value.eq(expected.as_i16()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected == 1)
    }

    /// Delete every vote on a target. Returns the number of rows removed.
    pub async fn delete_by_target<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &Target,
    ) -> AppResult<u64> {
        let result = Vote::delete_many()
            .filter(vote::Column::TargetKind.eq(target.kind))
            .filter(vote::Column::TargetId.eq(target.id.as_str()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count votes of one direction on a target.
    pub async fn count_by_value(&self, target: &Target, value: VoteValue) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::TargetKind.eq(target.kind))
            .filter(vote::Column::TargetId.eq(target.id.as_str()))
            .filter(vote::Column::Value.eq(value.as_i16()))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all votes on a target.
    pub async fn count_by_target(&self, target: &Target) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::TargetKind.eq(target.kind))
            .filter(vote::Column::TargetId.eq(target.id.as_str()))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get votes on a target (paginated).
    pub async fn find_by_target(
        &self,
        target: &Target,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let mut query = Vote::find()
            .filter(vote::Column::TargetKind.eq(target.kind))
            .filter(vote::Column::TargetId.eq(target.id.as_str()))
            .order_by_desc(vote::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(vote::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get votes cast by a user (paginated).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let mut query = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_desc(vote::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(vote::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
