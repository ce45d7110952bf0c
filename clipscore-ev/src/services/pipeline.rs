//! Evaluation submission pipeline
//!
//! Checks run in a fixed order and stop at the first failure:
//! watch time, duplicate insight, coherence. Failures are returned as
//! [`SubmissionOutcome::Rejected`] values. Acceptance writes the evaluation,
//! reward, quota increment, session status, mission progress and user
//! metrics in one transaction.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use clipscore_common::content_hash::content_hash;
use clipscore_common::{time, Error, Result};

use crate::db;
use crate::models::{
    CompletedMission, CriterionScores, Evaluation, EvaluationSession, NewLedgerEntry,
    RejectionReason,
};
use crate::services::coherence::{CoherenceEvaluator, CoherenceResult};
use crate::services::missions;
use crate::services::policy::EvaluationPolicy;
use crate::utils::retry_on_lock;

/// RNG shared by every request; locked only for one coherence evaluation
pub type SharedRng = Arc<Mutex<StdRng>>;

/// Scores and free-text insight submitted for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub scores: CriterionScores,
    pub insight_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted {
        evaluation_id: Uuid,
        session_id: Uuid,
        points_awarded: i64,
        coherence_score: f64,
        notes: Vec<String>,
        missions_completed: Vec<CompletedMission>,
    },
    Rejected {
        reason: RejectionReason,
        notes: Vec<String>,
    },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }
}

enum AcceptAttempt {
    Accepted(SubmissionOutcome),
    DuplicateUnderLock,
}

pub struct SubmissionPipeline {
    db: SqlitePool,
    rng: SharedRng,
    evaluator: CoherenceEvaluator,
}

impl SubmissionPipeline {
    pub fn new(db: SqlitePool, rng: SharedRng) -> Self {
        Self {
            db,
            rng,
            evaluator: CoherenceEvaluator::new(),
        }
    }

    pub async fn submit(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        submission: &Submission,
    ) -> Result<SubmissionOutcome> {
        submission.scores.validate()?;
        let insight_text = submission.insight_text.trim();
        if insight_text.is_empty() {
            return Err(Error::InvalidInput("insight_text must not be empty".to_string()));
        }

        let policy = EvaluationPolicy::load(&self.db).await?;
        let session = db::sessions::load_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::SessionState(format!("Session not found: {}", session_id)))?;
        session.ensure_open_for(user_id)?;

        let submitted_at = time::now();

        if session.watch_time_seconds < policy.watch_time_threshold_seconds {
            let note = format!(
                "Watched {}s, at least {}s required",
                session.watch_time_seconds, policy.watch_time_threshold_seconds
            );
            return self
                .reject(&session, RejectionReason::WatchTime, vec![note], submitted_at, &policy)
                .await;
        }

        let insight_hash = content_hash(insight_text);
        if db::evaluations::hash_in_recent(&self.db, user_id, &insight_hash, policy.duplicate_window)
            .await?
        {
            return self
                .reject(&session, RejectionReason::Duplicate, duplicate_notes(), submitted_at, &policy)
                .await;
        }

        let coherence = self.evaluate_coherence(&submission.scores, insight_text)?;
        if coherence.score < policy.coherence_min_score {
            return self
                .reject(&session, RejectionReason::Coherence, coherence.notes, submitted_at, &policy)
                .await;
        }

        let (session_ref, policy_ref) = (&session, &policy);
        let (hash_ref, coherence_ref) = (insight_hash.as_str(), &coherence);
        let attempt = retry_on_lock("evaluation acceptance", policy.database_max_lock_wait_ms, move || {
            self.accept_once(
                session_ref,
                &submission.scores,
                insight_text,
                hash_ref,
                coherence_ref,
                submitted_at,
                policy_ref,
            )
        })
        .await?;

        match attempt {
            AcceptAttempt::Accepted(outcome) => Ok(outcome),
            AcceptAttempt::DuplicateUnderLock => {
                self.reject(&session, RejectionReason::Duplicate, duplicate_notes(), submitted_at, &policy)
                    .await
            }
        }
    }

    fn evaluate_coherence(&self, scores: &CriterionScores, text: &str) -> Result<CoherenceResult> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::Internal("Coherence RNG lock poisoned".to_string()))?;
        Ok(self.evaluator.evaluate(&mut *rng, scores, text))
    }

    #[allow(clippy::too_many_arguments)]
    async fn accept_once(
        &self,
        session: &EvaluationSession,
        scores: &CriterionScores,
        insight_text: &str,
        insight_hash: &str,
        coherence: &CoherenceResult,
        submitted_at: DateTime<Utc>,
        policy: &EvaluationPolicy,
    ) -> Result<AcceptAttempt> {
        let user_id = session.user_id;
        let elapsed = time::elapsed_seconds(session.started_at, submitted_at);
        let mut tx = self.db.begin().await?;

        // The claim takes the write lock; everything after it is serialized
        if !db::sessions::claim_validated(&mut *tx, session.id, submitted_at, elapsed).await? {
            return Err(Error::SessionState(format!(
                "Session {} was already submitted",
                session.id
            )));
        }

        if db::evaluations::hash_in_recent(&mut *tx, user_id, insight_hash, policy.duplicate_window)
            .await?
        {
            tx.rollback().await?;
            return Ok(AcceptAttempt::DuplicateUnderLock);
        }

        let evaluation = Evaluation {
            id: clipscore_common::uuid_utils::generate(),
            session_id: session.id,
            user_id,
            scores: *scores,
            insight_text: insight_text.to_string(),
            insight_hash: insight_hash.to_string(),
            coherence_score: coherence.score,
            valid: true,
            created_at: submitted_at,
        };
        db::evaluations::insert_evaluation(&mut *tx, &evaluation).await?;

        let points = policy.points_per_valid_evaluation;
        db::ledger::append(
            &mut *tx,
            &NewLedgerEntry::evaluation_reward(user_id, evaluation.id, points),
        )
        .await?;

        db::users::increment_quota(&mut *tx, user_id).await?;

        let missions_completed =
            missions::apply_valid_evaluation(&mut *tx, user_id, evaluation.id, submitted_at).await?;

        db::users::recompute_metrics(&mut *tx, user_id).await?;
        tx.commit().await?;

        info!(
            session_id = %session.id,
            evaluation_id = %evaluation.id,
            %user_id,
            points,
            coherence = coherence.score,
            missions_completed = missions_completed.len(),
            "Evaluation accepted"
        );

        Ok(AcceptAttempt::Accepted(SubmissionOutcome::Accepted {
            evaluation_id: evaluation.id,
            session_id: session.id,
            points_awarded: points,
            coherence_score: coherence.score,
            notes: coherence.notes.clone(),
            missions_completed,
        }))
    }

    async fn reject(
        &self,
        session: &EvaluationSession,
        reason: RejectionReason,
        notes: Vec<String>,
        submitted_at: DateTime<Utc>,
        policy: &EvaluationPolicy,
    ) -> Result<SubmissionOutcome> {
        let elapsed = time::elapsed_seconds(session.started_at, submitted_at);

        let notes_ref = &notes;
        retry_on_lock("evaluation rejection", policy.database_max_lock_wait_ms, move || async move {
            let mut tx = self.db.begin().await?;
            let moved = db::sessions::mark_rejected(
                &mut *tx,
                session.id,
                reason,
                notes_ref,
                submitted_at,
                elapsed,
            )
            .await?;
            if !moved {
                return Err(Error::SessionState(format!(
                    "Session {} was already submitted",
                    session.id
                )));
            }
            db::users::recompute_metrics(&mut *tx, session.user_id).await?;
            tx.commit().await?;
            Ok(())
        })
        .await?;

        warn!(
            session_id = %session.id,
            user_id = %session.user_id,
            reason = reason.as_str(),
            "Evaluation rejected"
        );

        Ok(SubmissionOutcome::Rejected { reason, notes })
    }
}

fn duplicate_notes() -> Vec<String> {
    vec!["Insight matches one of your recent evaluations".to_string()]
}
