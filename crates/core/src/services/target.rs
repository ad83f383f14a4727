//! Target registry.
//!
//! Resolves a polymorphic `(kind, id)` reference to the content it names and
//! the user who owns that content.

use agora_common::{AppError, AppResult};
use agora_db::{
    entities::{Target, TargetKind, UnknownTargetKind, vote::VoteValue},
    repositories::{AnswerRepository, QuestionRepository},
};
use sea_orm::ConnectionTrait;

/// A target that exists, with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: Target,
    pub owner_id: String,
}

/// Registry of votable and reportable content kinds.
#[derive(Clone)]
pub struct TargetRegistry {
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
}

impl TargetRegistry {
    /// Create a new target registry.
    #[must_use]
    pub const fn new(question_repo: QuestionRepository, answer_repo: AnswerRepository) -> Self {
        Self {
            question_repo,
            answer_repo,
        }
    }

    /// Look up a target and its owner on the given connection.
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        conn: &C,
        target: &Target,
    ) -> AppResult<ResolvedTarget> {
        let owner_id = match target.kind {
            TargetKind::Question => self
                .question_repo
                .find_by_id(conn, &target.id)
                .await?
                .map(|q| q.user_id),
            TargetKind::Answer => self
                .answer_repo
                .find_by_id(conn, &target.id)
                .await?
                .map(|a| a.user_id),
        };

        owner_id
            .map(|owner_id| ResolvedTarget {
                target: target.clone(),
                owner_id,
            })
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", target.kind, target.id)))
    }
}

/// Parse an untyped target reference.
pub fn parse_target(kind: &str, id: &str) -> AppResult<Target> {
    let kind: TargetKind = kind
        .parse()
        .map_err(|e: UnknownTargetKind| AppError::Validation(e.to_string()))?;

    if id.trim().is_empty() {
        return Err(AppError::Validation("target id is empty".to_string()));
    }

    Ok(Target {
        kind,
        id: id.to_string(),
    })
}

/// Parse an untyped vote value. Only `1` and `-1` are accepted.
pub fn parse_vote_value(value: i64) -> AppResult<VoteValue> {
    VoteValue::try_from(value)
        .map_err(|raw| AppError::Validation(format!("vote value must be 1 or -1, got {raw}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::entities::{answer, question};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn registry(db: &Arc<sea_orm::DatabaseConnection>) -> TargetRegistry {
        TargetRegistry::new(
            QuestionRepository::new(db.clone()),
            AnswerRepository::new(db.clone()),
        )
    }

    #[tokio::test]
    async fn test_resolve_question_owner() {
        let question = question::Model {
            id: "q1".to_string(),
            user_id: "alice".to_string(),
            title: "How?".to_string(),
            body: "Details".to_string(),
            status: question::QuestionStatus::Open,
            best_answer_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[question]])
                .into_connection(),
        );

        let resolved = registry(&db)
            .resolve(db.as_ref(), &Target::question("q1"))
            .await
            .unwrap();

        assert_eq!(resolved.owner_id, "alice");
        assert_eq!(resolved.target, Target::question("q1"));
    }

    #[tokio::test]
    async fn test_resolve_missing_answer() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<answer::Model>::new()])
                .into_connection(),
        );

        let result = registry(&db)
            .resolve(db.as_ref(), &Target::answer("a404"))
            .await;

        match result {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "answer a404 not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("answer", "a1").unwrap(),
            Target::answer("a1")
        );
        assert!(matches!(
            parse_target("comment", "c1"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_target("question", "  "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_vote_value() {
        assert_eq!(parse_vote_value(1).unwrap(), VoteValue::Up);
        assert_eq!(parse_vote_value(-1).unwrap(), VoteValue::Down);
        for raw in [0, 2, -2, 5] {
            assert!(matches!(
                parse_vote_value(raw),
                Err(AppError::Validation(_))
            ));
        }
    }
}
