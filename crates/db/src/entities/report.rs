//! Report entity (abuse reports against questions and answers).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::target::{Target, TargetKind};

/// Why the content was reported.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    #[sea_orm(string_value = "spam")]
    Spam,
    #[sea_orm(string_value = "offensive")]
    Offensive,
    #[sea_orm(string_value = "inappropriate")]
    Inappropriate,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Moderation state of a report.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The reporter
    pub user_id: String,

    pub target_kind: TargetKind,

    pub target_id: String,

    pub reason: ReportReason,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: ReportStatus,

    /// Moderator notes
    #[sea_orm(column_type = "Text", nullable)]
    pub observations: Option<String>,

    #[sea_orm(nullable)]
    pub reviewed_by: Option<String>,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// The (kind, id) reference this report points at.
    #[must_use]
    pub fn target(&self) -> Target {
        Target {
            kind: self.target_kind,
            id: self.target_id.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
