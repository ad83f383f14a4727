//! Database repositories.

#![allow(missing_docs)]

pub mod answer;
pub mod question;
pub mod report;
pub mod user;
pub mod vote;

pub use answer::AnswerRepository;
pub use question::QuestionRepository;
pub use report::{ReportFilter, ReportRepository};
pub use user::UserRepository;
pub use vote::VoteRepository;
