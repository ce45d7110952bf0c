//! Point ledger persistence
//!
//! Insert-only. There is no UPDATE or DELETE against `points_ledger`
//! anywhere in the crate.

use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor};
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Result};

use crate::models::{LedgerEntry, NewLedgerEntry};

fn entry_from_row(row: &SqliteRow) -> Result<LedgerEntry> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let kind: String = row.try_get("kind")?;
    let ref_id: Option<String> = row.try_get("ref_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(LedgerEntry {
        id: uuid_utils::from_db(&id)?,
        user_id: uuid_utils::from_db(&user_id)?,
        kind: kind.parse()?,
        ref_id: ref_id.as_deref().map(uuid_utils::from_db).transpose()?,
        points: row.try_get("points")?,
        note: row.try_get("note")?,
        created_at: time::from_db(&created_at)?,
    })
}

/// Append one entry
///
/// A second `evaluation_reward`, `mission_bonus` or `reversal` for the same
/// reference fails with a unique violation.
pub async fn append<'e, E>(executor: E, entry: &NewLedgerEntry) -> Result<LedgerEntry>
where
    E: SqliteExecutor<'e>,
{
    let stored = LedgerEntry {
        id: uuid_utils::generate(),
        user_id: entry.user_id,
        kind: entry.kind,
        ref_id: entry.ref_id,
        points: entry.points,
        note: entry.note.clone(),
        created_at: time::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO points_ledger (id, user_id, kind, ref_id, points, note, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(stored.id.to_string())
    .bind(stored.user_id.to_string())
    .bind(stored.kind.as_str())
    .bind(stored.ref_id.map(|id| id.to_string()))
    .bind(stored.points)
    .bind(&stored.note)
    .bind(time::to_db(stored.created_at))
    .execute(executor)
    .await?;

    Ok(stored)
}

/// Current balance: the sum of every entry, 0 for a user with none
pub async fn balance<'e, E>(executor: E, user_id: Uuid) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(points), 0) FROM points_ledger WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(executor)
            .await?;

    Ok(total)
}

/// Entries for a user, newest first
pub async fn list_entries<'e, E>(
    executor: E,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<LedgerEntry>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, kind, ref_id, points, note, created_at
        FROM points_ledger
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

pub async fn load_entry<'e, E>(executor: E, entry_id: Uuid) -> Result<Option<LedgerEntry>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT id, user_id, kind, ref_id, points, note, created_at FROM points_ledger WHERE id = ?",
    )
    .bind(entry_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(entry_from_row).transpose()
}

/// Entries referencing `ref_id`, oldest first
pub async fn entries_for_ref<'e, E>(executor: E, ref_id: Uuid) -> Result<Vec<LedgerEntry>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, kind, ref_id, points, note, created_at
        FROM points_ledger WHERE ref_id = ?
        ORDER BY created_at
        "#,
    )
    .bind(ref_id.to_string())
    .fetch_all(executor)
    .await?;

    rows.iter().map(entry_from_row).collect()
}
