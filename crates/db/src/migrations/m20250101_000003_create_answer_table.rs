//! Create answer table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Answer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Answer::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Answer::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(Answer::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Answer::Body).text().not_null())
                    .col(
                        ColumnDef::new(Answer::BestAnswerAwarded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Answer::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Answer::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answer_question")
                            .from(Answer::Table, Answer::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answer_user")
                            .from(Answer::Table, Answer::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (question_id, user_id) - one answer per user per question
        manager
            .create_index(
                Index::create()
                    .name("idx_answer_question_user")
                    .table(Answer::Table)
                    .col(Answer::QuestionId)
                    .col(Answer::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Answer::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Answer {
    Table,
    Id,
    QuestionId,
    UserId,
    Body,
    BestAnswerAwarded,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
