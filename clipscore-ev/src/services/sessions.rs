//! Session lifecycle before submission: start and watch-time reporting

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use clipscore_common::{Error, Result};

use crate::db;
use crate::models::EvaluationSession;
use crate::services::policy::EvaluationPolicy;
use crate::services::quota::{check_quota, QuotaDecision};

/// Result of asking to start a session
#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// A new draft was created
    Started(EvaluationSession),
    /// The user already had a draft for this video
    Existing(EvaluationSession),
    /// The user's plan limits are used up
    QuotaExceeded(QuotaDecision),
}

pub struct SessionService {
    db: SqlitePool,
}

impl SessionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open a draft session for `user_id` on `video_id`
    pub async fn start(&self, user_id: Uuid, video_id: Uuid) -> Result<StartOutcome> {
        let policy = EvaluationPolicy::load(&self.db).await?;
        let user = db::users::require_user(&self.db, user_id).await?;
        let video = db::videos::load_video(&self.db, video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Video not found: {}", video_id)))?;
        if !video.active {
            return Err(Error::InvalidInput(format!("Video {} is not active", video_id)));
        }

        let open_drafts = db::sessions::count_open_drafts(&self.db, user_id).await?;

        if let Some(existing) = db::sessions::find_draft(&self.db, user_id, video_id).await? {
            // The resumed draft is the slot being asked for; only the others count
            let decision = check_quota(&user, &policy.plan_limits, (open_drafts - 1).max(0));
            if !decision.is_allowed() {
                info!(%user_id, session_id = %existing.id, "Draft resume refused: quota exceeded");
                return Ok(StartOutcome::QuotaExceeded(decision));
            }
            debug!(session_id = %existing.id, %user_id, "Returning existing draft session");
            return Ok(StartOutcome::Existing(existing));
        }

        let decision = check_quota(&user, &policy.plan_limits, open_drafts);
        if !decision.is_allowed() {
            info!(%user_id, open_drafts, "Session start refused: quota exceeded");
            return Ok(StartOutcome::QuotaExceeded(decision));
        }

        let limits = policy.plan_limits.for_tier(user.effective_tier());
        let session = EvaluationSession::new(user_id, video_id);
        match db::sessions::insert_session_within_quota(&self.db, &session, limits).await {
            Ok(true) => {
                info!(session_id = %session.id, %user_id, %video_id, "Evaluation session started");
                Ok(StartOutcome::Started(session))
            }
            Ok(false) => {
                // A concurrent start or acceptance took the last slot
                let user = db::users::require_user(&self.db, user_id).await?;
                let open_drafts = db::sessions::count_open_drafts(&self.db, user_id).await?;
                info!(%user_id, open_drafts, "Session start refused: quota exceeded");
                Ok(StartOutcome::QuotaExceeded(quota_refusal(
                    check_quota(&user, &policy.plan_limits, open_drafts),
                )))
            }
            Err(err) if err.is_unique_violation() => {
                // Lost a race with a concurrent start for the same video
                let existing = db::sessions::find_draft(&self.db, user_id, video_id)
                    .await?
                    .ok_or_else(|| {
                        Error::SessionState(format!(
                            "Draft for video {} was closed during start",
                            video_id
                        ))
                    })?;
                Ok(StartOutcome::Existing(existing))
            }
            Err(err) => Err(err),
        }
    }

    /// Load a session visible to `user_id`
    pub async fn get(&self, user_id: Uuid, session_id: Uuid) -> Result<EvaluationSession> {
        match db::sessions::load_session(&self.db, session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(Error::NotFound(format!("Session not found: {}", session_id))),
        }
    }

    /// Report accumulated watch time for an open draft
    ///
    /// The stored value only ever grows, so late or repeated reports are
    /// harmless.
    pub async fn record_watch_time(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        watch_time_seconds: i64,
    ) -> Result<EvaluationSession> {
        let policy = EvaluationPolicy::load(&self.db).await?;
        let session = db::sessions::load_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::SessionState(format!("Session not found: {}", session_id)))?;
        session.ensure_open_for(user_id)?;

        let video = db::videos::load_video(&self.db, session.video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Video not found: {}", session.video_id)))?;

        let max_allowed = video.duration_seconds + policy.watch_time_tolerance_seconds;
        if watch_time_seconds < 0 || watch_time_seconds > max_allowed {
            return Err(Error::InvalidInput(format!(
                "watch_time_seconds must be between 0 and {}, got {}",
                max_allowed, watch_time_seconds
            )));
        }

        let updated =
            db::sessions::record_watch_time(&self.db, session_id, user_id, watch_time_seconds)
                .await?;
        if !updated {
            return Err(Error::SessionState(format!(
                "Session {} is no longer draft",
                session_id
            )));
        }

        debug!(%session_id, watch_time_seconds, "Watch time recorded");
        db::sessions::load_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Session vanished: {}", session_id)))
    }
}

/// Report a refusal even when a re-read of the counters would now allow it
fn quota_refusal(decision: QuotaDecision) -> QuotaDecision {
    match decision {
        QuotaDecision::Allowed { plan_tier, usage, open_drafts, limits } => {
            QuotaDecision::QuotaExceeded { plan_tier, usage, open_drafts, limits }
        }
        exceeded => exceeded,
    }
}
