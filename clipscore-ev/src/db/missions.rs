//! Mission templates and per-user mission progress

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqliteExecutor};
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Error, Result};

use crate::models::{Mission, MissionMetric, UserMission, UserMissionView};

/// Fields supplied when defining a mission
#[derive(Debug, Clone)]
pub struct NewMission {
    pub code: String,
    pub title: String,
    pub description: String,
    pub metric: MissionMetric,
    pub target: i64,
    pub bonus_points: i64,
    pub active: bool,
}

fn mission_from_row(row: &SqliteRow) -> Result<Mission> {
    let id: String = row.try_get("m_id")?;
    let metric: String = row.try_get("metric")?;

    Ok(Mission {
        id: uuid_utils::from_db(&id)?,
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        metric: metric.parse()?,
        target: row.try_get("target")?,
        bonus_points: row.try_get("bonus_points")?,
        active: row.try_get("active")?,
    })
}

fn user_mission_from_row(row: &SqliteRow) -> Result<UserMission> {
    let id: String = row.try_get("um_id")?;
    let user_id: String = row.try_get("user_id")?;
    let mission_id: String = row.try_get("mission_id")?;
    let status: String = row.try_get("status")?;

    Ok(UserMission {
        id: uuid_utils::from_db(&id)?,
        user_id: uuid_utils::from_db(&user_id)?,
        mission_id: uuid_utils::from_db(&mission_id)?,
        progress_current: row.try_get("progress_current")?,
        progress_target: row.try_get("progress_target")?,
        status: status.parse()?,
        completed_at: time::from_db_opt(row.try_get("completed_at")?)?,
    })
}

const JOINED_COLUMNS: &str = r#"
    um.id AS um_id, um.user_id, um.mission_id, um.progress_current, um.progress_target,
    um.status, um.completed_at,
    m.id AS m_id, m.code, m.title, m.description, m.metric, m.target, m.bonus_points, m.active
"#;

pub async fn insert_mission<'e, E>(executor: E, new_mission: &NewMission) -> Result<Mission>
where
    E: SqliteExecutor<'e>,
{
    if new_mission.target <= 0 {
        return Err(Error::InvalidInput(format!(
            "Mission target must be positive, got {}",
            new_mission.target
        )));
    }
    if new_mission.bonus_points < 0 {
        return Err(Error::InvalidInput(format!(
            "Mission bonus must not be negative, got {}",
            new_mission.bonus_points
        )));
    }
    if new_mission.code.trim().is_empty() {
        return Err(Error::InvalidInput("Mission code must not be empty".to_string()));
    }

    let mission = Mission {
        id: uuid_utils::generate(),
        code: new_mission.code.trim().to_string(),
        title: new_mission.title.clone(),
        description: new_mission.description.clone(),
        metric: new_mission.metric,
        target: new_mission.target,
        bonus_points: new_mission.bonus_points,
        active: new_mission.active,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO missions (id, code, title, description, metric, target, bonus_points, active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(mission.id.to_string())
    .bind(&mission.code)
    .bind(&mission.title)
    .bind(&mission.description)
    .bind(mission.metric.as_str())
    .bind(mission.target)
    .bind(mission.bonus_points)
    .bind(mission.active)
    .execute(executor)
    .await
    .map_err(Error::Database);

    match result {
        Ok(_) => Ok(mission),
        Err(err) if err.is_unique_violation() => Err(Error::Conflict(format!(
            "Mission code already exists: {}",
            mission.code
        ))),
        Err(err) => Err(err),
    }
}

/// Enroll the user in every active mission they are not yet enrolled in
///
/// Returns the number of new enrollments.
pub async fn enroll_active(conn: &mut SqliteConnection, user_id: Uuid) -> Result<u64> {
    let missing: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT m.id, m.target FROM missions m
        WHERE m.active = 1
          AND NOT EXISTS (
              SELECT 1 FROM user_missions um
              WHERE um.mission_id = m.id AND um.user_id = ?
          )
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let mut enrolled = 0;
    for (mission_id, target) in missing {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_missions
                (id, user_id, mission_id, progress_current, progress_target, status)
            VALUES (?, ?, ?, 0, ?, 'open')
            "#,
        )
        .bind(uuid_utils::generate().to_string())
        .bind(user_id.to_string())
        .bind(&mission_id)
        .bind(target)
        .execute(&mut *conn)
        .await?;
        enrolled += result.rows_affected();
    }

    Ok(enrolled)
}

/// Open user missions of the user, with their templates
pub async fn open_user_missions(
    conn: &mut SqliteConnection,
    user_id: Uuid,
) -> Result<Vec<UserMissionView>> {
    let sql = format!(
        r#"
        SELECT {} FROM user_missions um
        JOIN missions m ON m.id = um.mission_id
        WHERE um.user_id = ? AND um.status = 'open'
        ORDER BY m.code
        "#,
        JOINED_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(view_from_row).collect()
}

/// Every mission of the user, open and completed
pub async fn list_user_missions<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<UserMissionView>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {} FROM user_missions um
        JOIN missions m ON m.id = um.mission_id
        WHERE um.user_id = ?
        ORDER BY um.status DESC, m.code
        "#,
        JOINED_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_all(executor)
        .await?;

    rows.iter().map(view_from_row).collect()
}

fn view_from_row(row: &SqliteRow) -> Result<UserMissionView> {
    Ok(UserMissionView {
        progress: user_mission_from_row(row)?,
        mission: mission_from_row(row)?,
    })
}

/// Record that `evaluation_id` counted toward `user_mission_id`
///
/// Returns false when it was already recorded.
pub async fn record_progress_event(
    conn: &mut SqliteConnection,
    user_mission_id: Uuid,
    evaluation_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO mission_progress_events (user_mission_id, evaluation_id, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_mission_id.to_string())
    .bind(evaluation_id.to_string())
    .bind(time::to_db(now))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Advance an open user mission by one, capped at its target
///
/// Returns the progress after the update.
pub async fn advance_progress(conn: &mut SqliteConnection, user_mission_id: Uuid) -> Result<i64> {
    sqlx::query(
        r#"
        UPDATE user_missions
        SET progress_current = MIN(progress_current + 1, progress_target)
        WHERE id = ? AND status = 'open'
        "#,
    )
    .bind(user_mission_id.to_string())
    .execute(&mut *conn)
    .await?;

    let progress: i64 =
        sqlx::query_scalar("SELECT progress_current FROM user_missions WHERE id = ?")
            .bind(user_mission_id.to_string())
            .fetch_one(&mut *conn)
            .await?;

    Ok(progress)
}

/// Conditionally move `open → completed` once progress reached the target
///
/// Returns false when the mission was already completed.
pub async fn complete_user_mission(
    conn: &mut SqliteConnection,
    user_mission_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE user_missions
        SET status = 'completed', completed_at = ?
        WHERE id = ? AND status = 'open' AND progress_current >= progress_target
        "#,
    )
    .bind(time::to_db(now))
    .bind(user_mission_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
