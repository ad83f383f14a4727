//! Report repository.

use std::sync::Arc;

use crate::entities::{
    Report, Target, TargetKind,
    report::{self, ReportReason, ReportStatus},
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TryGetable,
    sea_query::{Expr, OnConflict},
};

/// Optional filters for listing reports.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub reason: Option<ReportReason>,
    pub target_kind: Option<TargetKind>,
}

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a report unless the reporter already reported the target.
    ///
    /// Returns `None` when the unique index rejected the row.
    pub async fn create_if_absent(
        &self,
        model: report::ActiveModel,
    ) -> AppResult<Option<report::Model>> {
        let id = model.id.clone().take();
        let rows = Report::insert(model)
            .on_conflict(
                OnConflict::columns([
                    report::Column::UserId,
                    report::Column::TargetKind,
                    report::Column::TargetId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if rows == 0 {
            return Ok(None);
        }

        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Err(AppError::Internal("report inserted without id".to_string())),
        }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {id} not found")))
    }

    /// Update a report.
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Report::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete every report on a target.
    pub async fn delete_by_target<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &Target,
    ) -> AppResult<u64> {
        let result = Report::delete_many()
            .filter(report::Column::TargetKind.eq(target.kind))
            .filter(report::Column::TargetId.eq(target.id.as_str()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// List reports, newest first.
    pub async fn find_filtered(
        &self,
        filter: &ReportFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        let mut query = Report::find().order_by_desc(report::Column::CreatedAt);

        if let Some(status) = filter.status {
            query = query.filter(report::Column::Status.eq(status));
        }
        if let Some(reason) = filter.reason {
            query = query.filter(report::Column::Reason.eq(reason));
        }
        if let Some(kind) = filter.target_kind {
            query = query.filter(report::Column::TargetKind.eq(kind));
        }

        query
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all reports.
    pub async fn count_all(&self) -> AppResult<u64> {
        Report::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count reports grouped by status.
    pub async fn count_by_status(&self) -> AppResult<Vec<(ReportStatus, i64)>> {
        self.count_grouped(report::Column::Status).await
    }

    /// Count reports grouped by reason.
    pub async fn count_by_reason(&self) -> AppResult<Vec<(ReportReason, i64)>> {
        self.count_grouped(report::Column::Reason).await
    }

    /// Count reports grouped by target kind.
    pub async fn count_by_target_kind(&self) -> AppResult<Vec<(TargetKind, i64)>> {
        self.count_grouped(report::Column::TargetKind).await
    }

    async fn count_grouped<T>(&self, column: report::Column) -> AppResult<Vec<(T, i64)>>
    where
        T: TryGetable,
    {
        Report::find()
            .select_only()
            .column(column)
            .column_as(Expr::col(report::Column::Id).count(), "total")
            .group_by(column)
            .into_tuple::<(T, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
