//! Test utilities for database operations.
//!
//! Builds a migrated in-memory SQLite database and inserts fixture rows, so
//! behavioural tests exercise the real schema (unique indexes, cascades,
//! check constraints) without a running `PostgreSQL`.

use std::sync::{Arc, Once};

use crate::entities::{
    Target, answer,
    question::{self, QuestionStatus},
    user::{self, UserRole},
};
use crate::migrations::Migrator;
use crate::repositories::{UserRepository, VoteRepository};
use agora_common::IdGenerator;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, sea_query::Expr,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output is captured by the test harness.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "agora=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A migrated in-memory database with fixture helpers.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations.
    ///
    /// The pool is pinned to a single connection: every connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, DbErr> {
        init_test_tracing();

        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
            id_gen: IdGenerator::new(),
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Insert a user with the given role and zero reputation.
    pub async fn create_user(&self, username: &str, role: UserRole) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            role: Set(role),
            reputation: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert an open question authored by `user_id`.
    pub async fn create_question(&self, user_id: &str) -> Result<question::Model, DbErr> {
        question::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            title: Set("What does the borrow checker check?".to_string()),
            body: Set("Details inside.".to_string()),
            status: Set(QuestionStatus::Open),
            best_answer_id: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert an answer to `question_id` authored by `user_id`.
    pub async fn create_answer(
        &self,
        question_id: &str,
        user_id: &str,
    ) -> Result<answer::Model, DbErr> {
        answer::ActiveModel {
            id: Set(self.id_gen.generate()),
            question_id: Set(question_id.to_string()),
            user_id: Set(user_id.to_string()),
            body: Set("Ownership and lifetimes.".to_string()),
            best_answer_awarded: Set(false),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Overwrite a user's reputation (fixture setup only).
    pub async fn set_reputation(&self, user_id: &str, value: i32) -> Result<(), DbErr> {
        crate::entities::User::update_many()
            .col_expr(user::Column::Reputation, Expr::value(value))
            .filter(user::Column::Id.eq(user_id))
            .exec(self.conn.as_ref())
            .await?;
        Ok(())
    }

    /// Current reputation of a user.
    pub async fn reputation(&self, user_id: &str) -> i32 {
        UserRepository::new(self.conn.clone())
            .find_by_id(user_id)
            .await
            .ok()
            .flatten()
            .map_or(-1, |u| u.reputation)
    }

    /// Number of vote rows on a target.
    pub async fn vote_count(&self, target: &Target) -> u64 {
        VoteRepository::new(self.conn.clone())
            .count_by_target(target)
            .await
            .unwrap_or(u64::MAX)
    }
}
