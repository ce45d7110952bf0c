//! Evaluation session state machine
//!
//! `draft` → `validated` (accepted) or `rejected` (failed a check).
//! Both outcomes are terminal and immutable; persistence enforces the
//! single transition with a conditional `UPDATE … WHERE status = 'draft'`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Validated,
    Rejected,
}

/// Stable reason codes for business-rule rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    WatchTime,
    Duplicate,
    Coherence,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Validated => "validated",
            SessionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Draft)
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SessionStatus::Draft),
            "validated" => Ok(SessionStatus::Validated),
            "rejected" => Ok(SessionStatus::Rejected),
            other => Err(Error::Internal(format!("Unknown session status: {}", other))),
        }
    }
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::WatchTime => "watch_time",
            RejectionReason::Duplicate => "duplicate",
            RejectionReason::Coherence => "coherence",
        }
    }

    /// Column value for `reason_invalid`, where `none` means valid
    pub fn column_value(reason: Option<RejectionReason>) -> &'static str {
        reason.map(|r| r.as_str()).unwrap_or("none")
    }

    pub fn from_column(value: &str) -> Result<Option<Self>, Error> {
        match value {
            "none" => Ok(None),
            "watch_time" => Ok(Some(RejectionReason::WatchTime)),
            "duplicate" => Ok(Some(RejectionReason::Duplicate)),
            "coherence" => Ok(Some(RejectionReason::Coherence)),
            other => Err(Error::Internal(format!("Unknown rejection reason: {}", other))),
        }
    }
}

/// One watch-and-rate attempt by a user against a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub watch_time_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<i64>,
    pub status: SessionStatus,
    pub reason_invalid: Option<RejectionReason>,
    pub notes: Vec<String>,
}

impl EvaluationSession {
    /// New `draft` session starting now
    pub fn new(user_id: Uuid, video_id: Uuid) -> Self {
        Self {
            id: uuid_utils::generate(),
            user_id,
            video_id,
            watch_time_seconds: 0,
            started_at: time::now(),
            submitted_at: None,
            elapsed_seconds: None,
            status: SessionStatus::Draft,
            reason_invalid: None,
            notes: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fails unless the session belongs to `user_id` and is still `draft`
    pub fn ensure_open_for(&self, user_id: Uuid) -> Result<(), Error> {
        if self.user_id != user_id {
            return Err(Error::SessionState(format!("Session not found: {}", self.id)));
        }
        if self.is_terminal() {
            return Err(Error::SessionState(format!(
                "Session {} is {}, not draft",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}
