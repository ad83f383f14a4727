//! Business logic services.

#![allow(missing_docs)]

pub mod best_answer;
pub mod content;
pub mod hooks;
pub mod report;
pub mod reputation;
pub mod target;
pub mod vote;

use std::sync::Arc;

use agora_common::LedgerConfig;
use agora_db::repositories::{
    AnswerRepository, QuestionRepository, ReportRepository, UserRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;

pub use best_answer::{BestAnswerOutcome, BestAnswerService};
pub use content::{CascadeSummary, ContentService};
pub use hooks::{AuditLogHook, BestAnswerEvent, VoteEvent, VoteHook, VoteHookHandle, VoteHooks};
pub use report::{CreateReportInput, ReportService, ReportStatistics, ReviewReportInput};
pub use reputation::{
    ReputationChange, ReputationEngine, ReputationPolicy, VoteAction, VoteTransition,
};
pub use target::{ResolvedTarget, TargetRegistry, parse_target, parse_vote_value};
pub use vote::{VoteOutcome, VoteService, VoteStats};

/// Every service, wired to one connection pool.
#[derive(Clone)]
pub struct ForumServices {
    pub votes: VoteService,
    pub best_answers: BestAnswerService,
    pub content: ContentService,
    pub reports: ReportService,
}

impl ForumServices {
    /// Build the services over a connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, ledger: &LedgerConfig) -> Self {
        let user_repo = UserRepository::new(db.clone());
        let question_repo = QuestionRepository::new(db.clone());
        let answer_repo = AnswerRepository::new(db.clone());
        let vote_repo = VoteRepository::new(db.clone());
        let report_repo = ReportRepository::new(db.clone());

        let registry = TargetRegistry::new(question_repo.clone(), answer_repo.clone());
        let reputation = ReputationEngine::new(user_repo.clone());

        Self {
            votes: VoteService::new(
                db.clone(),
                vote_repo.clone(),
                registry.clone(),
                reputation.clone(),
                ledger,
            ),
            best_answers: BestAnswerService::new(
                db.clone(),
                question_repo.clone(),
                answer_repo.clone(),
                reputation,
            ),
            content: ContentService::new(
                db.clone(),
                question_repo,
                answer_repo,
                vote_repo,
                report_repo.clone(),
            ),
            reports: ReportService::new(db, report_repo, user_repo, registry),
        }
    }

    /// Notify `hooks` after every committed vote and best-answer mark.
    pub fn set_hooks(&mut self, hooks: VoteHooks) {
        self.votes.set_hooks(hooks.clone());
        self.best_answers.set_hooks(hooks);
    }
}
