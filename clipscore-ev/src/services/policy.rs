//! Evaluation policy loaded from the settings table
//!
//! Every key is required. Defaults are seeded by database initialization,
//! so a missing key means an operator removed it.

use sqlx::SqlitePool;

use clipscore_common::db::require_setting;
use clipscore_common::{Error, Result};

use crate::models::{PlanTier, QuotaCounts};

/// Per-tier daily and weekly submission limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub free: QuotaCounts,
    pub pro: QuotaCounts,
    pub pro_plus: QuotaCounts,
}

impl PlanLimits {
    pub fn for_tier(&self, tier: PlanTier) -> QuotaCounts {
        match tier {
            PlanTier::Free => self.free,
            PlanTier::Pro => self.pro,
            PlanTier::ProPlus => self.pro_plus,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationPolicy {
    pub watch_time_threshold_seconds: i64,
    pub watch_time_tolerance_seconds: i64,
    pub duplicate_window: i64,
    pub coherence_min_score: f64,
    pub points_per_valid_evaluation: i64,
    pub database_max_lock_wait_ms: u64,
    pub plan_limits: PlanLimits,
}

impl EvaluationPolicy {
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let policy = Self {
            watch_time_threshold_seconds: require_setting(pool, "watch_time_threshold_seconds")
                .await?,
            watch_time_tolerance_seconds: require_setting(pool, "watch_time_tolerance_seconds")
                .await?,
            duplicate_window: require_setting(pool, "duplicate_window").await?,
            coherence_min_score: require_setting(pool, "coherence_min_score").await?,
            points_per_valid_evaluation: require_setting(pool, "points_per_valid_evaluation")
                .await?,
            database_max_lock_wait_ms: require_setting(pool, "database_max_lock_wait_ms").await?,
            plan_limits: PlanLimits {
                free: load_limits(pool, "free").await?,
                pro: load_limits(pool, "pro").await?,
                pro_plus: load_limits(pool, "pro_plus").await?,
            },
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<()> {
        if self.watch_time_threshold_seconds < 0 || self.watch_time_tolerance_seconds < 0 {
            return Err(Error::Config("Watch time settings must not be negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.coherence_min_score) {
            return Err(Error::Config(format!(
                "coherence_min_score must be within 0..=1, got {}",
                self.coherence_min_score
            )));
        }
        if self.points_per_valid_evaluation < 0 {
            return Err(Error::Config(
                "points_per_valid_evaluation must not be negative".to_string(),
            ));
        }
        if self.duplicate_window <= 0 {
            return Err(Error::Config(format!(
                "duplicate_window must be positive, got {}",
                self.duplicate_window
            )));
        }
        for tier in [PlanTier::Free, PlanTier::Pro, PlanTier::ProPlus] {
            let limits = self.plan_limits.for_tier(tier);
            if limits.daily < 0 || limits.weekly < 0 {
                return Err(Error::Config(format!(
                    "Quota limits for plan {} must not be negative",
                    tier.as_str()
                )));
            }
        }
        Ok(())
    }
}

async fn load_limits(pool: &SqlitePool, tier: &str) -> Result<QuotaCounts> {
    Ok(QuotaCounts {
        daily: require_setting(pool, &format!("plan_{}_daily_quota", tier)).await?,
        weekly: require_setting(pool, &format!("plan_{}_weekly_quota", tier)).await?,
    })
}
