//! Mission progress updater
//!
//! Runs inside the acceptance transaction. Progress is recorded per
//! (user mission, evaluation) pair, so replaying the same evaluation never
//! advances a mission twice.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use clipscore_common::Result;

use crate::db;
use crate::models::{CompletedMission, MissionMetric, NewLedgerEntry};

/// Credit one valid evaluation to every open mission of the user
///
/// Returns the missions completed by this evaluation.
pub async fn apply_valid_evaluation(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    evaluation_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<CompletedMission>> {
    db::missions::enroll_active(&mut *conn, user_id).await?;

    let open = db::missions::open_user_missions(&mut *conn, user_id).await?;
    let mut completed = Vec::new();

    for view in open {
        if view.mission.metric != MissionMetric::ValidEvaluations {
            continue;
        }
        let user_mission_id = view.progress.id;

        let first_time =
            db::missions::record_progress_event(&mut *conn, user_mission_id, evaluation_id, now)
                .await?;
        if !first_time {
            continue;
        }

        let progress = db::missions::advance_progress(&mut *conn, user_mission_id).await?;
        if progress < view.progress.progress_target {
            continue;
        }

        if !db::missions::complete_user_mission(&mut *conn, user_mission_id, now).await? {
            continue;
        }

        if view.mission.bonus_points > 0 {
            let bonus = NewLedgerEntry::mission_bonus(
                user_id,
                user_mission_id,
                view.mission.bonus_points,
                &view.mission.title,
            );
            db::ledger::append(&mut *conn, &bonus).await?;
        }

        info!(
            %user_id,
            mission = %view.mission.code,
            bonus_points = view.mission.bonus_points,
            "Mission completed"
        );
        completed.push(CompletedMission {
            user_mission_id,
            mission_code: view.mission.code.clone(),
            bonus_points: view.mission.bonus_points,
        });
    }

    Ok(completed)
}
