//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Report::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Report::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::TargetKind).string_len(16).not_null())
                    .col(ColumnDef::new(Report::TargetId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::Reason).string_len(16).not_null())
                    .col(ColumnDef::new(Report::Description).text().null())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Report::Observations).text().null())
                    .col(ColumnDef::new(Report::ReviewedBy).string_len(32).null())
                    .col(
                        ColumnDef::new(Report::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_user")
                            .from(Report::Table, Report::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_reviewer")
                            .from(Report::Table, Report::ReviewedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one report per user per target
        manager
            .create_index(
                Index::create()
                    .name("idx_report_user_target")
                    .table(Report::Table)
                    .col(Report::UserId)
                    .col(Report::TargetKind)
                    .col(Report::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: status (moderation queue)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status")
                    .table(Report::Table)
                    .col(Report::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    UserId,
    TargetKind,
    TargetId,
    Reason,
    Description,
    Status,
    Observations,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
