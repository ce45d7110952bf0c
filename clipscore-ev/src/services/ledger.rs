//! Manual ledger corrections

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use clipscore_common::{Error, Result};

use crate::db;
use crate::models::{LedgerEntry, LedgerKind, NewLedgerEntry};

/// Grant or deduct points by hand
pub async fn adjust(
    pool: &SqlitePool,
    user_id: Uuid,
    points: i64,
    note: Option<String>,
) -> Result<LedgerEntry> {
    if points == 0 {
        return Err(Error::InvalidInput("Adjustment points must not be zero".to_string()));
    }
    db::users::require_user(pool, user_id).await?;

    let entry = db::ledger::append(
        pool,
        &NewLedgerEntry {
            user_id,
            kind: LedgerKind::Adjustment,
            ref_id: None,
            points,
            note,
        },
    )
    .await?;

    info!(%user_id, points, entry_id = %entry.id, "Ledger adjustment recorded");
    Ok(entry)
}

/// Append an entry negating `entry_id`
///
/// Reversals cannot be reversed, and an entry is reversed at most once.
pub async fn reverse(pool: &SqlitePool, entry_id: Uuid, note: Option<String>) -> Result<LedgerEntry> {
    let original = db::ledger::load_entry(pool, entry_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Ledger entry not found: {}", entry_id)))?;

    if original.kind == LedgerKind::Reversal {
        return Err(Error::InvalidInput(format!(
            "Ledger entry {} is a reversal and cannot be reversed",
            entry_id
        )));
    }

    match db::ledger::append(pool, &NewLedgerEntry::reversal_of(&original, note)).await {
        Ok(reversal) => {
            info!(
                user_id = %original.user_id,
                reversed = %entry_id,
                points = reversal.points,
                "Ledger entry reversed"
            );
            Ok(reversal)
        }
        Err(err) if err.is_unique_violation() => Err(Error::Conflict(format!(
            "Ledger entry {} was already reversed",
            entry_id
        ))),
        Err(err) => Err(err),
    }
}
