//! Schema-level tests against a migrated in-memory SQLite database.
//!
//! Run with: `cargo test -p agora-db --features test-utils --test schema`

#![allow(clippy::unwrap_used)]

use agora_common::IdGenerator;
use agora_db::entities::{Target, user::UserRole, vote};
use agora_db::repositories::{AnswerRepository, QuestionRepository, UserRepository, VoteRepository};
use agora_db::test_utils::TestDatabase;
use sea_orm::Set;

fn new_vote(voter_id: &str, target: &Target, value: vote::VoteValue) -> vote::ActiveModel {
    let now = chrono::Utc::now();
    vote::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        user_id: Set(voter_id.to_string()),
        target_kind: Set(target.kind),
        target_id: Set(target.id.clone()),
        value: Set(value.as_i16()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

#[tokio::test]
async fn test_unique_index_rejects_second_vote() {
    let db = TestDatabase::in_memory().await.unwrap();
    let author = db.create_user("author", UserRole::Member).await.unwrap();
    let voter = db.create_user("voter", UserRole::Member).await.unwrap();
    let question = db.create_question(&author.id).await.unwrap();
    let target = Target::question(&question.id);

    let repo = VoteRepository::new(db.connection());
    let conn = db.connection();

    let first = repo
        .insert_if_absent(conn.as_ref(), new_vote(&voter.id, &target, vote::VoteValue::Up))
        .await
        .unwrap();
    let second = repo
        .insert_if_absent(conn.as_ref(), new_vote(&voter.id, &target, vote::VoteValue::Down))
        .await
        .unwrap();

    assert!(first);
    assert!(!second);
    assert_eq!(db.vote_count(&target).await, 1);

    let stored = repo
        .find_for_voter(conn.as_ref(), &voter.id, &target)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.vote_value(), Some(vote::VoteValue::Up));
}

#[tokio::test]
async fn test_same_voter_different_kinds_are_independent() {
    let db = TestDatabase::in_memory().await.unwrap();
    let author = db.create_user("author", UserRole::Member).await.unwrap();
    let voter = db.create_user("voter", UserRole::Member).await.unwrap();
    let question = db.create_question(&author.id).await.unwrap();
    let answer = db.create_answer(&question.id, &author.id).await.unwrap();

    let repo = VoteRepository::new(db.connection());
    let conn = db.connection();

    for target in [Target::question(&question.id), Target::answer(&answer.id)] {
        let inserted = repo
            .insert_if_absent(conn.as_ref(), new_vote(&voter.id, &target, vote::VoteValue::Up))
            .await
            .unwrap();
        assert!(inserted, "{target}");
    }
}

#[tokio::test]
async fn test_compare_and_swap_update() {
    let db = TestDatabase::in_memory().await.unwrap();
    let author = db.create_user("author", UserRole::Member).await.unwrap();
    let voter = db.create_user("voter", UserRole::Member).await.unwrap();
    let question = db.create_question(&author.id).await.unwrap();
    let target = Target::question(&question.id);

    let repo = VoteRepository::new(db.connection());
    let conn = db.connection();
    let model = new_vote(&voter.id, &target, vote::VoteValue::Up);
    let id = model.id.clone().unwrap();
    repo.insert_if_absent(conn.as_ref(), model).await.unwrap();

    // Stale expectation: the row holds Up, not Down.
    let stale = repo
        .update_value_if(conn.as_ref(), &id, vote::VoteValue::Down, vote::VoteValue::Up)
        .await
        .unwrap();
    let fresh = repo
        .update_value_if(conn.as_ref(), &id, vote::VoteValue::Up, vote::VoteValue::Down)
        .await
        .unwrap();

    assert!(!stale);
    assert!(fresh);
    assert!(!repo.delete_if(conn.as_ref(), &id, vote::VoteValue::Up).await.unwrap());
    assert!(repo.delete_if(conn.as_ref(), &id, vote::VoteValue::Down).await.unwrap());
    assert_eq!(db.vote_count(&target).await, 0);
}

#[tokio::test]
async fn test_reputation_clamps_at_zero() {
    let db = TestDatabase::in_memory().await.unwrap();
    let user = db.create_user("author", UserRole::Member).await.unwrap();
    let repo = UserRepository::new(db.connection());
    let conn = db.connection();

    assert_eq!(repo.adjust_reputation(conn.as_ref(), &user.id, 5).await.unwrap(), 5);
    assert_eq!(repo.adjust_reputation(conn.as_ref(), &user.id, -2).await.unwrap(), 3);
    assert_eq!(repo.adjust_reputation(conn.as_ref(), &user.id, -7).await.unwrap(), 0);
    assert_eq!(db.reputation(&user.id).await, 0);
}

#[tokio::test]
async fn test_deleting_question_cascades_to_answers() {
    let db = TestDatabase::in_memory().await.unwrap();
    let author = db.create_user("author", UserRole::Member).await.unwrap();
    let helper = db.create_user("helper", UserRole::Member).await.unwrap();
    let question = db.create_question(&author.id).await.unwrap();
    let answer = db.create_answer(&question.id, &helper.id).await.unwrap();

    let questions = QuestionRepository::new(db.connection());
    let answers = AnswerRepository::new(db.connection());
    let conn = db.connection();

    assert!(questions.delete(conn.as_ref(), &question.id).await.unwrap());
    assert!(answers.find_by_id(conn.as_ref(), &answer.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_one_answer_per_user_per_question() {
    let db = TestDatabase::in_memory().await.unwrap();
    let author = db.create_user("author", UserRole::Member).await.unwrap();
    let helper = db.create_user("helper", UserRole::Member).await.unwrap();
    let question = db.create_question(&author.id).await.unwrap();

    db.create_answer(&question.id, &helper.id).await.unwrap();
    assert!(db.create_answer(&question.id, &helper.id).await.is_err());
}
