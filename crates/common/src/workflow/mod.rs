//! Role-gated article workflow
//!
//! ```text
//! draft --(editor submits)--> pending_admin_review
//! pending_admin_review --(admin approves)--> pending_super_admin_review
//! pending_admin_review --(admin/super_admin rejects)--> rejected
//! pending_super_admin_review --(super_admin approves)--> approved
//! pending_super_admin_review --(admin/super_admin rejects)--> rejected
//! approved --(super_admin publishes)--> published
//! ```
//!
//! Role and input checks run before the store is touched. Each transition is
//! then a single conditional update; zero affected rows means the article was
//! missing or not in a state the transition accepts, and is reported as
//! [`AppError::NotApplicable`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::Actor;
use crate::db::models::{ArticleStatus, ReviewerRole, UserRole};
use crate::db::store::{ArticleStore, Transition, TransitionGuard, TransitionPatch};
use crate::errors::{AppError, Result};
use crate::metrics::record_transition;

/// How much the approve and reject transitions check the current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// The acting role alone decides the next state
    #[default]
    Permissive,
    /// The article must be waiting in a queue the acting role may clear
    Strict,
}

/// State of an article after a successful transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub article_id: i64,
    pub status: ArticleStatus,
    pub current_reviewer_role: Option<ReviewerRole>,
}

#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn ArticleStore>,
    policy: ApprovalPolicy,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn ArticleStore>, policy: ApprovalPolicy) -> Self {
        Self { store, policy }
    }

    /// Editor sends their draft to the admin queue
    #[instrument(skip(self), fields(actor_id = actor.id, role = %actor.role))]
    pub async fn submit(&self, article_id: i64, actor: &Actor) -> Result<TransitionOutcome> {
        let result = self.try_submit(article_id, actor).await;
        finish("submit", article_id, actor, result)
    }

    /// Admin forwards to the super admin queue; super admin approves outright
    #[instrument(skip(self), fields(actor_id = actor.id, role = %actor.role))]
    pub async fn approve(&self, article_id: i64, actor: &Actor) -> Result<TransitionOutcome> {
        let result = self.try_approve(article_id, actor).await;
        finish("approve", article_id, actor, result)
    }

    #[instrument(skip(self, reason), fields(actor_id = actor.id, role = %actor.role))]
    pub async fn reject(
        &self,
        article_id: i64,
        actor: &Actor,
        reason: &str,
    ) -> Result<TransitionOutcome> {
        let result = self.try_reject(article_id, actor, reason).await;
        finish("reject", article_id, actor, result)
    }

    /// Approved articles go live
    #[instrument(skip(self), fields(actor_id = actor.id, role = %actor.role))]
    pub async fn publish(&self, article_id: i64, actor: &Actor) -> Result<TransitionOutcome> {
        let result = self.try_publish(article_id, actor).await;
        finish("publish", article_id, actor, result)
    }

    async fn try_submit(&self, article_id: i64, actor: &Actor) -> Result<TransitionOutcome> {
        if actor.role != UserRole::Editor {
            return Err(AppError::forbidden("Only editors can submit articles for review"));
        }

        let transition = Transition {
            article_id,
            guard: TransitionGuard {
                statuses: Some(vec![ArticleStatus::Draft]),
                owner: Some(actor.id),
            },
            patch: patch(ArticleStatus::PendingAdminReview, Some(ReviewerRole::Admin))
                .submitted_by(actor.id),
        };

        self.apply("submit", transition).await
    }

    async fn try_approve(&self, article_id: i64, actor: &Actor) -> Result<TransitionOutcome> {
        let Some(reviewer) = actor.role.as_reviewer() else {
            return Err(AppError::forbidden("Only admins can approve articles"));
        };

        let (next, queue, strict_from) = match reviewer {
            ReviewerRole::Admin => (
                ArticleStatus::PendingSuperAdminReview,
                Some(ReviewerRole::SuperAdmin),
                vec![ArticleStatus::PendingAdminReview],
            ),
            ReviewerRole::SuperAdmin => (
                ArticleStatus::Approved,
                None,
                vec![
                    ArticleStatus::PendingAdminReview,
                    ArticleStatus::PendingSuperAdminReview,
                ],
            ),
        };

        let transition = Transition {
            article_id,
            guard: TransitionGuard {
                statuses: self.strict_only(strict_from),
                owner: None,
            },
            patch: patch(next, queue).approved_by(actor.id),
        };

        self.apply("approve", transition).await
    }

    async fn try_reject(
        &self,
        article_id: i64,
        actor: &Actor,
        reason: &str,
    ) -> Result<TransitionOutcome> {
        if !actor.role.is_staff() {
            return Err(AppError::forbidden("Only admins can reject articles"));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "Rejection reason is required"));
        }

        let mut patch = patch(ArticleStatus::Rejected, None).approved_by(actor.id);
        patch.rejection_reason = Some(reason.to_string());

        let transition = Transition {
            article_id,
            guard: TransitionGuard {
                statuses: self.strict_only(vec![
                    ArticleStatus::PendingAdminReview,
                    ArticleStatus::PendingSuperAdminReview,
                ]),
                owner: None,
            },
            patch,
        };

        self.apply("reject", transition).await
    }

    async fn try_publish(&self, article_id: i64, actor: &Actor) -> Result<TransitionOutcome> {
        if actor.role != UserRole::SuperAdmin {
            return Err(AppError::forbidden("Only super admins can publish articles"));
        }

        let mut patch = patch(ArticleStatus::Published, None);
        patch.go_live = true;

        let transition = Transition {
            article_id,
            guard: TransitionGuard {
                statuses: Some(vec![ArticleStatus::Approved]),
                owner: None,
            },
            patch,
        };

        self.apply("publish", transition).await
    }

    fn strict_only(&self, statuses: Vec<ArticleStatus>) -> Option<Vec<ArticleStatus>> {
        match self.policy {
            ApprovalPolicy::Permissive => None,
            ApprovalPolicy::Strict => Some(statuses),
        }
    }

    async fn apply(&self, operation: &str, transition: Transition) -> Result<TransitionOutcome> {
        let affected = self.store.apply_transition(&transition).await?;
        if affected == 0 {
            return Err(AppError::NotApplicable {
                id: transition.article_id,
                operation: operation.to_string(),
            });
        }

        Ok(TransitionOutcome {
            article_id: transition.article_id,
            status: transition.patch.status,
            current_reviewer_role: transition.patch.current_reviewer_role,
        })
    }
}

fn patch(status: ArticleStatus, reviewer: Option<ReviewerRole>) -> TransitionPatch {
    TransitionPatch {
        status,
        current_reviewer_role: reviewer,
        submitted_by: None,
        approved_by: None,
        rejection_reason: None,
        go_live: false,
        at: chrono::Utc::now().into(),
    }
}

impl TransitionPatch {
    fn submitted_by(mut self, user_id: i64) -> Self {
        self.submitted_by = Some(user_id);
        self
    }

    fn approved_by(mut self, user_id: i64) -> Self {
        self.approved_by = Some(user_id);
        self
    }
}

fn finish(
    operation: &'static str,
    article_id: i64,
    actor: &Actor,
    result: Result<TransitionOutcome>,
) -> Result<TransitionOutcome> {
    let outcome = match &result {
        Ok(done) => {
            info!(
                article_id,
                actor_id = actor.id,
                role = %actor.role,
                status = done.status.as_str(),
                "Workflow {} applied", operation
            );
            "applied"
        }
        Err(AppError::Forbidden { .. }) => "forbidden",
        Err(AppError::Validation { .. }) => "invalid",
        Err(AppError::NotApplicable { .. }) => {
            warn!(article_id, actor_id = actor.id, "{} matched no article", operation);
            "not_applicable"
        }
        Err(_) => "error",
    };
    record_transition(operation, outcome);
    result
}
