//! Data models for clipscore-ev
//!
//! - Evaluation session state machine
//! - Evaluations, ledger entries, missions, user accounts, videos

pub mod evaluation;
pub mod ledger;
pub mod mission;
pub mod session;
pub mod user;
pub mod video;

pub use evaluation::{CriterionScores, Evaluation, SCORE_MAX, SCORE_MIN};
pub use ledger::{LedgerEntry, LedgerKind, NewLedgerEntry};
pub use mission::{CompletedMission, Mission, MissionMetric, UserMission, UserMissionStatus, UserMissionView};
pub use session::{EvaluationSession, RejectionReason, SessionStatus};
pub use user::{PlanStatus, PlanTier, QuotaCounts, Role, UserAccount};
pub use video::Video;
