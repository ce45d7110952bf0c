//! Quota pre-check at session start
//!
//! Open drafts hold a slot until they are submitted, so a user can never have
//! more drafts in flight than accepted submissions left.

use serde::Serialize;

use crate::models::{PlanTier, QuotaCounts, UserAccount};
use crate::services::policy::PlanLimits;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuotaDecision {
    Allowed {
        plan_tier: PlanTier,
        usage: QuotaCounts,
        open_drafts: i64,
        limits: QuotaCounts,
    },
    QuotaExceeded {
        plan_tier: PlanTier,
        usage: QuotaCounts,
        open_drafts: i64,
        limits: QuotaCounts,
    },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }
}

/// Compare the user's counters plus `open_drafts` with the limits of their
/// effective plan
///
/// Refuses when either sum has reached its limit.
pub fn check_quota(user: &UserAccount, plan_limits: &PlanLimits, open_drafts: i64) -> QuotaDecision {
    let plan_tier = user.effective_tier();
    let limits = plan_limits.for_tier(plan_tier);
    let usage = user.quota_usage();

    if usage.daily + open_drafts >= limits.daily || usage.weekly + open_drafts >= limits.weekly {
        QuotaDecision::QuotaExceeded { plan_tier, usage, open_drafts, limits }
    } else {
        QuotaDecision::Allowed { plan_tier, usage, open_drafts, limits }
    }
}
