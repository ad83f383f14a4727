//! Database entities.

#![allow(missing_docs)]

pub mod answer;
pub mod question;
pub mod report;
pub mod target;
pub mod user;
pub mod vote;

pub use answer::Entity as Answer;
pub use question::Entity as Question;
pub use report::Entity as Report;
pub use target::{Target, TargetKind, UnknownTargetKind};
pub use user::Entity as User;
pub use vote::Entity as Vote;
