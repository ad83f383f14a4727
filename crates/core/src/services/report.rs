//! Report service for abuse reports on questions and answers.

use std::collections::HashMap;
use std::sync::Arc;

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{
        Target, TargetKind,
        report::{self, ReportReason, ReportStatus},
        user::{self, UserRole},
    },
    repositories::{ReportFilter, ReportRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Iterable, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::target::TargetRegistry;

/// Maximum page size for report listings.
const MAX_PAGE_SIZE: u64 = 100;

/// Input for creating a report.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub target: Target,
    pub reason: ReportReason,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Input for reviewing a report.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportInput {
    pub report_id: String,
    pub status: ReportStatus,
    #[validate(length(max = 500))]
    pub observations: Option<String>,
}

/// Report counts for the moderation dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    pub total: u64,
    pub by_status: HashMap<ReportStatus, u64>,
    pub by_reason: HashMap<ReportReason, u64>,
    pub by_target_kind: HashMap<TargetKind, u64>,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
    report_repo: ReportRepository,
    user_repo: UserRepository,
    registry: TargetRegistry,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        report_repo: ReportRepository,
        user_repo: UserRepository,
        registry: TargetRegistry,
    ) -> Self {
        Self {
            db,
            report_repo,
            user_repo,
            registry,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report against a question or answer.
    pub async fn create(
        &self,
        reporter_id: &str,
        input: CreateReportInput,
    ) -> AppResult<report::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.user_repo.get_by_id(reporter_id).await?;

        let resolved = self.registry.resolve(self.db.as_ref(), &input.target).await?;
        if resolved.owner_id == reporter_id {
            return Err(AppError::BadRequest(
                "Cannot report your own content".to_string(),
            ));
        }

        let description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(reporter_id.to_string()),
            target_kind: Set(input.target.kind),
            target_id: Set(input.target.id.clone()),
            reason: Set(input.reason),
            description: Set(description),
            status: Set(ReportStatus::Pending),
            observations: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let report = self
            .report_repo
            .create_if_absent(model)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("You have already reported this content".to_string())
            })?;

        tracing::info!(
            report_id = %report.id,
            reporter_id = %reporter_id,
            target = %input.target,
            reason = ?report.reason,
            "Report created"
        );

        Ok(report)
    }

    /// Get a report. Visible to its reporter and to moderators.
    pub async fn get(&self, viewer_id: &str, report_id: &str) -> AppResult<report::Model> {
        let report = self.report_repo.get_by_id(report_id).await?;
        if report.user_id != viewer_id {
            self.require_moderator(viewer_id).await?;
        }
        Ok(report)
    }

    /// Record a moderator's decision on a report.
    pub async fn review(
        &self,
        moderator_id: &str,
        input: ReviewReportInput,
    ) -> AppResult<report::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.require_moderator(moderator_id).await?;

        let report = self.report_repo.get_by_id(&input.report_id).await?;

        let mut active: report::ActiveModel = report.into();
        active.status = Set(input.status);
        active.observations = Set(input.observations);
        active.reviewed_by = Set(Some(moderator_id.to_string()));
        active.reviewed_at = Set(Some(Utc::now().into()));

        let updated = self.report_repo.update(active).await?;

        tracing::info!(
            report_id = %updated.id,
            moderator_id = %moderator_id,
            status = ?updated.status,
            "Report reviewed"
        );

        Ok(updated)
    }

    /// Delete a report. Admins only.
    pub async fn delete(&self, admin_id: &str, report_id: &str) -> AppResult<()> {
        let admin = self.user_repo.get_by_id(admin_id).await?;
        if admin.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Only admins can delete reports".to_string(),
            ));
        }

        if !self.report_repo.delete(report_id).await? {
            return Err(AppError::NotFound(format!("Report {report_id} not found")));
        }

        tracing::info!(report_id = %report_id, admin_id = %admin_id, "Report deleted");
        Ok(())
    }

    /// List reports, newest first.
    pub async fn list(
        &self,
        moderator_id: &str,
        filter: &ReportFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        self.require_moderator(moderator_id).await?;
        self.report_repo
            .find_filtered(filter, limit.clamp(1, MAX_PAGE_SIZE), offset)
            .await
    }

    /// Report totals by status, reason and target kind.
    pub async fn statistics(&self, moderator_id: &str) -> AppResult<ReportStatistics> {
        self.require_moderator(moderator_id).await?;

        let total = self.report_repo.count_all().await?;

        Ok(ReportStatistics {
            total,
            by_status: with_zeroes(self.report_repo.count_by_status().await?),
            by_reason: with_zeroes(self.report_repo.count_by_reason().await?),
            by_target_kind: with_zeroes(self.report_repo.count_by_target_kind().await?),
        })
    }

    async fn require_moderator(&self, user_id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.role.can_moderate() {
            return Err(AppError::Forbidden(
                "Moderator privileges required".to_string(),
            ));
        }
        Ok(user)
    }
}

/// Grouped counts keyed by every variant, missing groups as zero.
fn with_zeroes<K>(counts: Vec<(K, i64)>) -> HashMap<K, u64>
where
    K: Iterable + Eq + std::hash::Hash,
{
    let mut map: HashMap<K, u64> = K::iter().map(|k| (k, 0)).collect();
    for (key, count) in counts {
        map.insert(key, count.max(0) as u64);
    }
    map
}
