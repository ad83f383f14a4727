//! Vote hooks.
//!
//! Collaborators (notifications, badges, search ranking) observe committed
//! vote and best-answer changes through [`VoteHook`]. Hooks run after the
//! transaction commits; a failing hook is logged and never undoes the change.

use std::sync::Arc;

use agora_common::AppResult;
use agora_db::entities::Target;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::reputation::{ReputationChange, VoteTransition};

/// A committed vote ledger change.
#[derive(Debug, Clone)]
pub struct VoteEvent {
    /// Ledger row the transition applied to.
    pub vote_id: String,
    pub voter_id: String,
    pub target: Target,
    /// Owner of the target.
    pub author_id: String,
    pub transition: VoteTransition,
    /// Present when the author's reputation moved.
    pub reputation: Option<ReputationChange>,
    pub occurred_at: DateTime<Utc>,
}

/// A committed best-answer mark.
#[derive(Debug, Clone)]
pub struct BestAnswerEvent {
    pub question_id: String,
    pub answer_id: String,
    pub author_id: String,
    /// Present the first time the answer is marked.
    pub granted: Option<ReputationChange>,
    pub occurred_at: DateTime<Utc>,
}

/// Observer of vote activity.
#[async_trait]
pub trait VoteHook: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Called once per committed vote transition.
    async fn on_vote(&self, event: &VoteEvent) -> AppResult<()>;

    /// Called once per committed best-answer mark.
    async fn on_best_answer(&self, _event: &BestAnswerEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Shared hook handle.
pub type VoteHookHandle = Arc<dyn VoteHook>;

/// Ordered set of hooks notified after commit.
#[derive(Clone, Default)]
pub struct VoteHooks {
    hooks: Vec<VoteHookHandle>,
}

impl VoteHooks {
    /// Create an empty hook set.
    #[must_use]
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook.
    pub fn register(&mut self, hook: VoteHookHandle) {
        self.hooks.push(hook);
    }

    /// Add a hook, builder style.
    #[must_use]
    pub fn with(mut self, hook: VoteHookHandle) -> Self {
        self.register(hook);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Notify every hook of a vote transition.
    pub async fn dispatch_vote(&self, event: &VoteEvent) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_vote(event).await {
                tracing::warn!(
                    hook = hook.name(),
                    vote_id = %event.vote_id,
                    target = %event.target,
                    error = %e,
                    "Vote hook failed"
                );
            }
        }
    }

    /// Notify every hook of a best-answer mark.
    pub async fn dispatch_best_answer(&self, event: &BestAnswerEvent) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_best_answer(event).await {
                tracing::warn!(
                    hook = hook.name(),
                    answer_id = %event.answer_id,
                    error = %e,
                    "Best answer hook failed"
                );
            }
        }
    }
}

/// Writes every vote activity event to the `agora::audit` log target.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLogHook;

#[async_trait]
impl VoteHook for AuditLogHook {
    fn name(&self) -> &'static str {
        "audit_log"
    }

    async fn on_vote(&self, event: &VoteEvent) -> AppResult<()> {
        tracing::info!(
            target: "agora::audit",
            vote_id = %event.vote_id,
            voter_id = %event.voter_id,
            author_id = %event.author_id,
            target = %event.target,
            action = ?event.transition.action(),
            value = ?event.transition.current_value(),
            reputation_delta = event.reputation.as_ref().map(|r| r.delta),
            "vote"
        );
        Ok(())
    }

    async fn on_best_answer(&self, event: &BestAnswerEvent) -> AppResult<()> {
        tracing::info!(
            target: "agora::audit",
            question_id = %event.question_id,
            answer_id = %event.answer_id,
            author_id = %event.author_id,
            granted = event.granted.is_some(),
            "best_answer"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_common::AppError;
    use agora_db::entities::vote::VoteValue;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        votes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VoteHook for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn on_vote(&self, event: &VoteEvent) -> AppResult<()> {
            self.votes.lock().unwrap().push(event.vote_id.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl VoteHook for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn on_vote(&self, _event: &VoteEvent) -> AppResult<()> {
            Err(AppError::Internal("hook down".to_string()))
        }
    }

    fn event() -> VoteEvent {
        VoteEvent {
            vote_id: "v1".to_string(),
            voter_id: "bob".to_string(),
            target: Target::question("q1"),
            author_id: "alice".to_string(),
            transition: VoteTransition::Created {
                value: VoteValue::Up,
            },
            reputation: None,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_stop_later_hooks() {
        let recorder = Arc::new(Recorder::default());
        let hooks = VoteHooks::new()
            .with(Arc::new(Failing))
            .with(recorder.clone());

        hooks.dispatch_vote(&event()).await;

        assert_eq!(hooks.len(), 2);
        assert_eq!(*recorder.votes.lock().unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_default_best_answer_handler_is_noop() {
        let hooks = VoteHooks::new().with(Arc::new(Recorder::default()));
        hooks
            .dispatch_best_answer(&BestAnswerEvent {
                question_id: "q1".to_string(),
                answer_id: "a1".to_string(),
                author_id: "carol".to_string(),
                granted: None,
                occurred_at: Utc::now(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_audit_hook_accepts_events() {
        assert!(AuditLogHook.on_vote(&event()).await.is_ok());
    }
}
