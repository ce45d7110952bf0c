//! Evaluation session persistence
//!
//! Every transition out of `draft` is a conditional update on
//! `status = 'draft'`; callers learn from the return value whether they won.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor};
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Error, Result};

use crate::models::{EvaluationSession, QuotaCounts, RejectionReason, SessionStatus};

const SESSION_COLUMNS: &str = r#"
    id, user_id, video_id, watch_time_seconds, started_at, submitted_at,
    elapsed_seconds, status, reason_invalid, notes
"#;

fn session_from_row(row: &SqliteRow) -> Result<EvaluationSession> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let video_id: String = row.try_get("video_id")?;
    let started_at: String = row.try_get("started_at")?;
    let status: String = row.try_get("status")?;
    let reason: String = row.try_get("reason_invalid")?;
    let notes: String = row.try_get("notes")?;
    let notes: Vec<String> = serde_json::from_str(&notes)
        .map_err(|e| Error::Internal(format!("Failed to deserialize session notes: {}", e)))?;

    Ok(EvaluationSession {
        id: uuid_utils::from_db(&id)?,
        user_id: uuid_utils::from_db(&user_id)?,
        video_id: uuid_utils::from_db(&video_id)?,
        watch_time_seconds: row.try_get("watch_time_seconds")?,
        started_at: time::from_db(&started_at)?,
        submitted_at: time::from_db_opt(row.try_get("submitted_at")?)?,
        elapsed_seconds: row.try_get("elapsed_seconds")?,
        status: status.parse::<SessionStatus>()?,
        reason_invalid: RejectionReason::from_column(&reason)?,
        notes,
    })
}

/// Insert a new `draft` session if the user still has quota for it
///
/// The user's used counters plus their open drafts must stay below both
/// `limits`; the check and the insert are one statement, so concurrent starts
/// cannot overshoot. Returns false when the quota is used up. Fails with a
/// unique violation when the user already has a draft for the same video.
pub async fn insert_session_within_quota<'e, E>(
    executor: E,
    session: &EvaluationSession,
    limits: QuotaCounts,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO evaluation_sessions (
            id, user_id, video_id, watch_time_seconds, started_at, status, reason_invalid, notes
        )
        SELECT ?, u.id, ?, ?, ?, 'draft', ?, '[]'
        FROM users u
        WHERE u.id = ?
          AND u.daily_quota_used + (
                SELECT COUNT(*) FROM evaluation_sessions
                WHERE user_id = u.id AND status = 'draft'
              ) < ?
          AND u.weekly_quota_used + (
                SELECT COUNT(*) FROM evaluation_sessions
                WHERE user_id = u.id AND status = 'draft'
              ) < ?
        "#,
    )
    .bind(session.id.to_string())
    .bind(session.video_id.to_string())
    .bind(session.watch_time_seconds)
    .bind(time::to_db(session.started_at))
    .bind(RejectionReason::column_value(None))
    .bind(session.user_id.to_string())
    .bind(limits.daily)
    .bind(limits.weekly)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Number of `draft` sessions the user has open
pub async fn count_open_drafts<'e, E>(executor: E, user_id: Uuid) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evaluation_sessions WHERE user_id = ? AND status = 'draft'",
    )
    .bind(user_id.to_string())
    .fetch_one(executor)
    .await?;

    Ok(count)
}

pub async fn load_session<'e, E>(executor: E, session_id: Uuid) -> Result<Option<EvaluationSession>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {} FROM evaluation_sessions WHERE id = ?", SESSION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(session_from_row).transpose()
}

/// The user's open draft for a video, if any
pub async fn find_draft<'e, E>(
    executor: E,
    user_id: Uuid,
    video_id: Uuid,
) -> Result<Option<EvaluationSession>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM evaluation_sessions WHERE user_id = ? AND video_id = ? AND status = 'draft'",
        SESSION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(video_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(session_from_row).transpose()
}

/// Raise the recorded watch time of a draft; never lowers it
///
/// Returns false when the session is not an open draft of `user_id`.
pub async fn record_watch_time<'e, E>(
    executor: E,
    session_id: Uuid,
    user_id: Uuid,
    watch_time_seconds: i64,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE evaluation_sessions
        SET watch_time_seconds = MAX(watch_time_seconds, ?)
        WHERE id = ? AND user_id = ? AND status = 'draft'
        "#,
    )
    .bind(watch_time_seconds)
    .bind(session_id.to_string())
    .bind(user_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Claim `draft → validated`, stamping submit time and elapsed duration
///
/// Returns false when another attempt already moved the session out of
/// `draft`.
pub async fn claim_validated<'e, E>(
    executor: E,
    session_id: Uuid,
    submitted_at: DateTime<Utc>,
    elapsed_seconds: i64,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE evaluation_sessions
        SET status = 'validated', submitted_at = ?, elapsed_seconds = ?, reason_invalid = ?
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(time::to_db(submitted_at))
    .bind(elapsed_seconds)
    .bind(RejectionReason::column_value(None))
    .bind(session_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move `draft → rejected` with the captured reason and notes
///
/// Returns false when the session was no longer `draft`.
pub async fn mark_rejected<'e, E>(
    executor: E,
    session_id: Uuid,
    reason: RejectionReason,
    notes: &[String],
    submitted_at: DateTime<Utc>,
    elapsed_seconds: i64,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let notes = serde_json::to_string(notes)
        .map_err(|e| Error::Internal(format!("Failed to serialize session notes: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE evaluation_sessions
        SET status = 'rejected', reason_invalid = ?, notes = ?, submitted_at = ?, elapsed_seconds = ?
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(RejectionReason::column_value(Some(reason)))
    .bind(notes)
    .bind(time::to_db(submitted_at))
    .bind(elapsed_seconds)
    .bind(session_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
