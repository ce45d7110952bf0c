//! Append-only point ledger entries
//!
//! A user's balance is always the sum of their entries. Entries are never
//! updated or deleted; a wrong grant is corrected with a `reversal`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use clipscore_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    EvaluationReward,
    MissionBonus,
    Adjustment,
    Reversal,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::EvaluationReward => "evaluation_reward",
            LedgerKind::MissionBonus => "mission_bonus",
            LedgerKind::Adjustment => "adjustment",
            LedgerKind::Reversal => "reversal",
        }
    }
}

impl FromStr for LedgerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evaluation_reward" => Ok(LedgerKind::EvaluationReward),
            "mission_bonus" => Ok(LedgerKind::MissionBonus),
            "adjustment" => Ok(LedgerKind::Adjustment),
            "reversal" => Ok(LedgerKind::Reversal),
            other => Err(Error::Internal(format!("Unknown ledger kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: LedgerKind,
    /// Originating evaluation, user-mission, or reversed entry
    pub ref_id: Option<Uuid>,
    pub points: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry to append; id and timestamp are assigned on insert
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: Uuid,
    pub kind: LedgerKind,
    pub ref_id: Option<Uuid>,
    pub points: i64,
    pub note: Option<String>,
}

impl NewLedgerEntry {
    pub fn evaluation_reward(user_id: Uuid, evaluation_id: Uuid, points: i64) -> Self {
        Self {
            user_id,
            kind: LedgerKind::EvaluationReward,
            ref_id: Some(evaluation_id),
            points,
            note: Some("Valid evaluation".to_string()),
        }
    }

    pub fn mission_bonus(user_id: Uuid, user_mission_id: Uuid, points: i64, title: &str) -> Self {
        Self {
            user_id,
            kind: LedgerKind::MissionBonus,
            ref_id: Some(user_mission_id),
            points,
            note: Some(format!("Mission completed: {}", title)),
        }
    }

    /// Negating entry for `original`
    pub fn reversal_of(original: &LedgerEntry, note: Option<String>) -> Self {
        Self {
            user_id: original.user_id,
            kind: LedgerKind::Reversal,
            ref_id: Some(original.id),
            points: -original.points,
            note,
        }
    }
}
