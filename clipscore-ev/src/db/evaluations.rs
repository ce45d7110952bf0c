//! Evaluation persistence and duplicate lookup

use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor};
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Result};

use crate::models::{CriterionScores, Evaluation, RejectionReason};

fn evaluation_from_row(row: &SqliteRow) -> Result<Evaluation> {
    let id: String = row.try_get("id")?;
    let session_id: String = row.try_get("session_id")?;
    let user_id: String = row.try_get("user_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Evaluation {
        id: uuid_utils::from_db(&id)?,
        session_id: uuid_utils::from_db(&session_id)?,
        user_id: uuid_utils::from_db(&user_id)?,
        scores: CriterionScores {
            hook: row.try_get("score_hook")?,
            retention: row.try_get("score_retention")?,
            clarity: row.try_get("score_clarity")?,
            cta: row.try_get("score_cta")?,
        },
        insight_text: row.try_get("insight_text")?,
        insight_hash: row.try_get("insight_hash")?,
        coherence_score: row.try_get("coherence_score")?,
        valid: row.try_get("valid")?,
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert_evaluation<'e, E>(executor: E, evaluation: &Evaluation) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO evaluations (
            id, session_id, user_id, score_hook, score_retention, score_clarity, score_cta,
            insight_text, insight_hash, coherence_score, valid, reason_invalid, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(evaluation.id.to_string())
    .bind(evaluation.session_id.to_string())
    .bind(evaluation.user_id.to_string())
    .bind(evaluation.scores.hook)
    .bind(evaluation.scores.retention)
    .bind(evaluation.scores.clarity)
    .bind(evaluation.scores.cta)
    .bind(&evaluation.insight_text)
    .bind(&evaluation.insight_hash)
    .bind(evaluation.coherence_score)
    .bind(evaluation.valid)
    .bind(RejectionReason::column_value(None))
    .bind(time::to_db(evaluation.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn load_evaluation_for_session<'e, E>(
    executor: E,
    session_id: Uuid,
) -> Result<Option<Evaluation>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT id, session_id, user_id, score_hook, score_retention, score_clarity, score_cta,
               insight_text, insight_hash, coherence_score, valid, created_at
        FROM evaluations WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(evaluation_from_row).transpose()
}

/// True when `insight_hash` matches one of the user's `window` most recent
/// evaluations
pub async fn hash_in_recent<'e, E>(
    executor: E,
    user_id: Uuid,
    insight_hash: &str,
    window: i64,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    if window <= 0 {
        return Ok(false);
    }

    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM (
            SELECT insight_hash FROM evaluations
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
        ) WHERE insight_hash = ?
        LIMIT 1
        "#,
    )
    .bind(user_id.to_string())
    .bind(window)
    .bind(insight_hash)
    .fetch_optional(executor)
    .await?;

    Ok(found.is_some())
}
