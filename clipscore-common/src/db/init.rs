//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies pragmas, creates every
//! table idempotently and seeds default policy settings.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Default policy settings seeded on first run
///
/// Seeding uses `INSERT OR IGNORE`, so operator edits survive restarts.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("watch_time_threshold_seconds", "20"),
    ("watch_time_tolerance_seconds", "5"),
    ("duplicate_window", "20"),
    ("coherence_min_score", "0.70"),
    ("points_per_valid_evaluation", "20"),
    ("database_max_lock_wait_ms", "5000"),
    ("plan_free_daily_quota", "10"),
    ("plan_free_weekly_quota", "40"),
    ("plan_pro_daily_quota", "50"),
    ("plan_pro_weekly_quota", "250"),
    ("plan_pro_plus_daily_quota", "100"),
    ("plan_pro_plus_weekly_quota", "700"),
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Per-connection pragmas: every pooled connection needs them
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_videos_table(pool).await?;
    create_evaluation_sessions_table(pool).await?;
    create_evaluations_table(pool).await?;
    create_points_ledger_table(pool).await?;
    create_missions_table(pool).await?;
    create_user_missions_table(pool).await?;
    create_mission_progress_events_table(pool).await?;
    create_billing_payments_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores policy configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user'
                CHECK (role IN ('user', 'admin')),
            plan_tier TEXT NOT NULL DEFAULT 'free'
                CHECK (plan_tier IN ('free', 'pro', 'pro_plus')),
            plan_status TEXT NOT NULL DEFAULT 'inactive'
                CHECK (plan_status IN ('inactive', 'active', 'past_due', 'canceled')),
            plan_renews_at TEXT,
            daily_quota_used INTEGER NOT NULL DEFAULT 0 CHECK (daily_quota_used >= 0),
            weekly_quota_used INTEGER NOT NULL DEFAULT 0 CHECK (weekly_quota_used >= 0),
            quota_reset_daily_at TEXT,
            quota_reset_weekly_at TEXT,
            ia_upgrade INTEGER NOT NULL DEFAULT 0,
            ia_upgrade_at TEXT,
            approval_rate REAL,
            avg_eval_time_seconds REAL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_videos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            source_url TEXT NOT NULL,
            thumb_url TEXT,
            duration_seconds INTEGER NOT NULL CHECK (duration_seconds > 0),
            topic TEXT,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'inactive')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_evaluation_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluation_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            video_id TEXT NOT NULL REFERENCES videos(id),
            watch_time_seconds INTEGER NOT NULL DEFAULT 0 CHECK (watch_time_seconds >= 0),
            started_at TEXT NOT NULL,
            submitted_at TEXT,
            elapsed_seconds INTEGER,
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'validated', 'rejected')),
            reason_invalid TEXT NOT NULL DEFAULT 'none'
                CHECK (reason_invalid IN ('none', 'watch_time', 'duplicate', 'coherence')),
            notes TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one open attempt per (user, video)
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_draft
        ON evaluation_sessions(user_id, video_id) WHERE status = 'draft'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_user_status ON evaluation_sessions(user_id, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_evaluations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluations (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE REFERENCES evaluation_sessions(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            score_hook INTEGER NOT NULL CHECK (score_hook BETWEEN 0 AND 10),
            score_retention INTEGER NOT NULL CHECK (score_retention BETWEEN 0 AND 10),
            score_clarity INTEGER NOT NULL CHECK (score_clarity BETWEEN 0 AND 10),
            score_cta INTEGER NOT NULL CHECK (score_cta BETWEEN 0 AND 10),
            insight_text TEXT NOT NULL,
            insight_hash TEXT NOT NULL,
            coherence_score REAL NOT NULL,
            valid INTEGER NOT NULL DEFAULT 1,
            reason_invalid TEXT NOT NULL DEFAULT 'none',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_evaluations_user_created ON evaluations(user_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_points_ledger_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS points_ledger (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            kind TEXT NOT NULL
                CHECK (kind IN ('evaluation_reward', 'mission_bonus', 'adjustment', 'reversal')),
            ref_id TEXT,
            points INTEGER NOT NULL,
            note TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Exactly-once crediting: one reward per evaluation, one bonus per
    // user-mission, one reversal per reversed entry
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_once_per_ref
        ON points_ledger(kind, ref_id)
        WHERE kind IN ('evaluation_reward', 'mission_bonus', 'reversal')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_user ON points_ledger(user_id, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_missions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS missions (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            metric TEXT NOT NULL DEFAULT 'valid_evaluations',
            target INTEGER NOT NULL CHECK (target > 0),
            bonus_points INTEGER NOT NULL CHECK (bonus_points >= 0),
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_missions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_missions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            mission_id TEXT NOT NULL REFERENCES missions(id),
            progress_current INTEGER NOT NULL DEFAULT 0,
            progress_target INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'completed')),
            completed_at TEXT,
            UNIQUE (user_id, mission_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_mission_progress_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mission_progress_events (
            user_mission_id TEXT NOT NULL REFERENCES user_missions(id),
            evaluation_id TEXT NOT NULL REFERENCES evaluations(id),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_mission_id, evaluation_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_billing_payments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS billing_payments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            provider TEXT NOT NULL,
            product TEXT NOT NULL,
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL DEFAULT 'USD',
            status TEXT NOT NULL,
            external_id TEXT UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed default policy settings without overwriting existing values
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULT_SETTINGS {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    info!("Default settings ensured ({} keys)", DEFAULT_SETTINGS.len());
    Ok(())
}
