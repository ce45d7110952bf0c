//! User account persistence
//!
//! Quota counters have exactly two writers: [`increment_quota`] (the
//! submission pipeline) and the reset functions used by the sweep. Plan
//! columns are written only by the plan-transition functions.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqliteExecutor};
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Error, Result};

use crate::models::{PlanStatus, PlanTier, Role, UserAccount};

const USER_COLUMNS: &str = r#"
    id, name, email, role, plan_tier, plan_status, plan_renews_at,
    daily_quota_used, weekly_quota_used, quota_reset_daily_at, quota_reset_weekly_at,
    ia_upgrade, ia_upgrade_at, approval_rate, avg_eval_time_seconds, created_at
"#;

/// Fields supplied when creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

fn user_from_row(row: &SqliteRow) -> Result<UserAccount> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let plan_tier: String = row.try_get("plan_tier")?;
    let plan_status: String = row.try_get("plan_status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(UserAccount {
        id: uuid_utils::from_db(&id)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role.parse()?,
        plan_tier: plan_tier.parse()?,
        plan_status: plan_status.parse()?,
        plan_renews_at: time::from_db_opt(row.try_get("plan_renews_at")?)?,
        daily_quota_used: row.try_get("daily_quota_used")?,
        weekly_quota_used: row.try_get("weekly_quota_used")?,
        quota_reset_daily_at: time::from_db_opt(row.try_get("quota_reset_daily_at")?)?,
        quota_reset_weekly_at: time::from_db_opt(row.try_get("quota_reset_weekly_at")?)?,
        ia_upgrade: row.try_get("ia_upgrade")?,
        ia_upgrade_at: time::from_db_opt(row.try_get("ia_upgrade_at")?)?,
        approval_rate: row.try_get("approval_rate")?,
        avg_eval_time_seconds: row.try_get("avg_eval_time_seconds")?,
        created_at: time::from_db(&created_at)?,
    })
}

/// Create a user on the free plan with quota resets scheduled from now
pub async fn create_user<'e, E>(executor: E, new_user: &NewUser) -> Result<UserAccount>
where
    E: SqliteExecutor<'e>,
{
    let name = new_user.name.trim();
    let email = new_user.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(Error::InvalidInput("User name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(Error::InvalidInput(format!("Invalid email: {}", new_user.email)));
    }

    let now = time::now();
    let account = UserAccount {
        id: uuid_utils::generate(),
        name: name.to_string(),
        email,
        role: new_user.role,
        plan_tier: PlanTier::Free,
        plan_status: PlanStatus::Inactive,
        plan_renews_at: None,
        daily_quota_used: 0,
        weekly_quota_used: 0,
        quota_reset_daily_at: Some(time::next_daily_reset(now)),
        quota_reset_weekly_at: Some(time::next_weekly_reset(now)),
        ia_upgrade: false,
        ia_upgrade_at: None,
        approval_rate: None,
        avg_eval_time_seconds: None,
        created_at: now,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (
            id, name, email, role, plan_tier, plan_status,
            daily_quota_used, weekly_quota_used, quota_reset_daily_at, quota_reset_weekly_at,
            ia_upgrade, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?, 0, ?)
        "#,
    )
    .bind(account.id.to_string())
    .bind(&account.name)
    .bind(&account.email)
    .bind(account.role.as_str())
    .bind(account.plan_tier.as_str())
    .bind(account.plan_status.as_str())
    .bind(account.quota_reset_daily_at.map(time::to_db))
    .bind(account.quota_reset_weekly_at.map(time::to_db))
    .bind(time::to_db(now))
    .execute(executor)
    .await
    .map_err(Error::Database);

    match result {
        Ok(_) => Ok(account),
        Err(err) if err.is_unique_violation() => Err(Error::Conflict(format!(
            "Email already registered: {}",
            account.email
        ))),
        Err(err) => Err(err),
    }
}

/// Load a user by id
pub async fn load_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<UserAccount>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Load a user or fail with NotFound
pub async fn require_user<'e, E>(executor: E, user_id: Uuid) -> Result<UserAccount>
where
    E: SqliteExecutor<'e>,
{
    load_user(executor, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))
}

/// Add one accepted submission to both quota counters
pub async fn increment_quota(conn: &mut SqliteConnection, user_id: Uuid) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET daily_quota_used = daily_quota_used + 1,
            weekly_quota_used = weekly_quota_used + 1
        WHERE id = ?
        "#,
    )
    .bind(user_id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(Error::NotFound(format!("User not found: {}", user_id)));
    }
    Ok(())
}

/// Recompute approval rate and average evaluation time from session history
///
/// Only terminal sessions count. Both metrics are NULL when there is no
/// relevant history.
pub async fn recompute_metrics(conn: &mut SqliteConnection, user_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            approval_rate = (
                SELECT CASE WHEN COUNT(*) = 0 THEN NULL
                       ELSE CAST(SUM(status = 'validated') AS REAL) / COUNT(*) END
                FROM evaluation_sessions
                WHERE user_id = users.id AND status IN ('validated', 'rejected')
            ),
            avg_eval_time_seconds = (
                SELECT AVG(elapsed_seconds)
                FROM evaluation_sessions
                WHERE user_id = users.id AND status = 'validated' AND elapsed_seconds IS NOT NULL
            )
        WHERE id = ?
        "#,
    )
    .bind(user_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Zero daily counters whose reset time has passed and schedule the next reset
pub async fn reset_due_daily_quotas<'e, E>(executor: E, now: DateTime<Utc>) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET daily_quota_used = 0, quota_reset_daily_at = ?
        WHERE quota_reset_daily_at IS NOT NULL AND quota_reset_daily_at <= ?
        "#,
    )
    .bind(time::to_db(time::next_daily_reset(now)))
    .bind(time::to_db(now))
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Zero weekly counters whose reset time has passed and schedule the next reset
pub async fn reset_due_weekly_quotas<'e, E>(executor: E, now: DateTime<Utc>) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET weekly_quota_used = 0, quota_reset_weekly_at = ?
        WHERE quota_reset_weekly_at IS NOT NULL AND quota_reset_weekly_at <= ?
        "#,
    )
    .bind(time::to_db(time::next_weekly_reset(now)))
    .bind(time::to_db(now))
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Activate a paid plan after a successful payment
///
/// Also grants the AI upgrade and zeroes the quota counters.
pub async fn activate_plan(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    tier: PlanTier,
    renews_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET plan_tier = ?, plan_status = 'active', plan_renews_at = ?,
            ia_upgrade = 1, ia_upgrade_at = ?,
            daily_quota_used = 0, weekly_quota_used = 0
        WHERE id = ?
        "#,
    )
    .bind(tier.as_str())
    .bind(time::to_db(renews_at))
    .bind(time::to_db(now))
    .bind(user_id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(Error::NotFound(format!("User not found: {}", user_id)));
    }
    Ok(())
}

/// Revert a user to the free plan after cancellation
pub async fn cancel_plan<'e, E>(executor: E, user_id: Uuid) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET plan_tier = 'free', plan_status = 'canceled', ia_upgrade = 0
        WHERE id = ?
        "#,
    )
    .bind(user_id.to_string())
    .execute(executor)
    .await?;

    if result.rows_affected() != 1 {
        return Err(Error::NotFound(format!("User not found: {}", user_id)));
    }
    Ok(())
}
