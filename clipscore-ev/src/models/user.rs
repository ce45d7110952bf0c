//! User account subset relevant to evaluation rewards
//!
//! Plan tier and status are written only by plan transitions (payment
//! webhook). Quota counters are written only by the submission pipeline (+1)
//! and the reset sweep (zero + reschedule).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use clipscore_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Pro,
    ProPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Inactive,
    Active,
    PastDue,
    Canceled,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(Error::Internal(format!("Unknown role: {}", other))),
        }
    }
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::ProPlus => "pro_plus",
        }
    }
}

impl FromStr for PlanTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "pro_plus" => Ok(PlanTier::ProPlus),
            other => Err(Error::Internal(format!("Unknown plan tier: {}", other))),
        }
    }
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Inactive => "inactive",
            PlanStatus::Active => "active",
            PlanStatus::PastDue => "past_due",
            PlanStatus::Canceled => "canceled",
        }
    }

    /// Paid limits stay in force while billing is current or in grace
    pub fn grants_paid_limits(&self) -> bool {
        matches!(self, PlanStatus::Active | PlanStatus::PastDue)
    }
}

impl FromStr for PlanStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(PlanStatus::Inactive),
            "active" => Ok(PlanStatus::Active),
            "past_due" => Ok(PlanStatus::PastDue),
            "canceled" => Ok(PlanStatus::Canceled),
            other => Err(Error::Internal(format!("Unknown plan status: {}", other))),
        }
    }
}

/// Daily and weekly counters, used both for usage and for limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounts {
    pub daily: i64,
    pub weekly: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub plan_tier: PlanTier,
    pub plan_status: PlanStatus,
    pub plan_renews_at: Option<DateTime<Utc>>,
    pub daily_quota_used: i64,
    pub weekly_quota_used: i64,
    pub quota_reset_daily_at: Option<DateTime<Utc>>,
    pub quota_reset_weekly_at: Option<DateTime<Utc>>,
    pub ia_upgrade: bool,
    pub ia_upgrade_at: Option<DateTime<Utc>>,
    pub approval_rate: Option<f64>,
    pub avg_eval_time_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Tier whose limits currently apply
    pub fn effective_tier(&self) -> PlanTier {
        if self.plan_tier != PlanTier::Free && self.plan_status.grants_paid_limits() {
            self.plan_tier
        } else {
            PlanTier::Free
        }
    }

    pub fn quota_usage(&self) -> QuotaCounts {
        QuotaCounts {
            daily: self.daily_quota_used,
            weekly: self.weekly_quota_used,
        }
    }
}
