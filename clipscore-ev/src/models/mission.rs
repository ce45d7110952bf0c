//! Missions and per-user mission progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use clipscore_common::Error;

/// What a mission counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionMetric {
    ValidEvaluations,
}

impl MissionMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionMetric::ValidEvaluations => "valid_evaluations",
        }
    }
}

impl FromStr for MissionMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid_evaluations" => Ok(MissionMetric::ValidEvaluations),
            other => Err(Error::InvalidInput(format!("Unknown mission metric: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMissionStatus {
    Open,
    Completed,
}

impl UserMissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserMissionStatus::Open => "open",
            UserMissionStatus::Completed => "completed",
        }
    }
}

impl FromStr for UserMissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(UserMissionStatus::Open),
            "completed" => Ok(UserMissionStatus::Completed),
            other => Err(Error::Internal(format!("Unknown user mission status: {}", other))),
        }
    }
}

/// Shared read-only mission template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub metric: MissionMetric,
    pub target: i64,
    pub bonus_points: i64,
    pub active: bool,
}

/// One user's progress toward one mission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mission_id: Uuid,
    pub progress_current: i64,
    pub progress_target: i64,
    pub status: UserMissionStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

/// User mission joined with its template, as listed to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMissionView {
    #[serde(flatten)]
    pub progress: UserMission,
    pub mission: Mission,
}

/// Mission finished during one accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMission {
    pub user_mission_id: Uuid,
    pub mission_code: String,
    pub bonus_points: i64,
}
