//! Periodic quota reset sweep
//!
//! Each counter whose reset time has passed is zeroed and its next reset is
//! scheduled relative to the sweep time. Running the sweep twice at the same
//! instant resets nothing the second time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info};

use clipscore_common::Result;

use crate::db;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub daily_resets: u64,
    pub weekly_resets: u64,
}

pub async fn run_sweep(pool: &SqlitePool, now: DateTime<Utc>) -> Result<SweepReport> {
    let mut tx = pool.begin().await?;
    let daily_resets = db::users::reset_due_daily_quotas(&mut *tx, now).await?;
    let weekly_resets = db::users::reset_due_weekly_quotas(&mut *tx, now).await?;
    tx.commit().await?;

    let report = SweepReport { daily_resets, weekly_resets };
    if daily_resets > 0 || weekly_resets > 0 {
        info!(daily_resets, weekly_resets, "Quota counters reset");
    }
    Ok(report)
}

/// Run the sweep every `interval` until the task is aborted
pub async fn sweep_loop(pool: SqlitePool, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = run_sweep(&pool, clipscore_common::time::now()).await {
            error!("Quota reset sweep failed: {}", e);
        }
    }
}
