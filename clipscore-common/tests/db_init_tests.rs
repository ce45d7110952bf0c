//! Tests for database initialization, schema constraints and settings

use clipscore_common::db::init::{init_database, DEFAULT_SETTINGS, SCHEMA_VERSION};
use clipscore_common::db::settings::{delete_setting, get_setting, require_setting, set_setting};
use clipscore_common::Error;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("clipscore.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("clipscore.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool2.unwrap())
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("clipscore.db")).await.unwrap();

    for (key, value) in DEFAULT_SETTINGS {
        let stored = get_setting(&pool, key).await.unwrap();
        assert_eq!(stored.as_deref(), Some(*value), "Setting {} not seeded", key);
    }

    let threshold: i64 = require_setting(&pool, "watch_time_threshold_seconds").await.unwrap();
    assert_eq!(threshold, 20);
}

#[tokio::test]
async fn test_reinit_preserves_operator_settings() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("clipscore.db");

    let pool = init_database(&db_path).await.unwrap();
    set_setting(&pool, "duplicate_window", "3").await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let window: i64 = require_setting(&pool, "duplicate_window").await.unwrap();
    assert_eq!(window, 3);
}

#[tokio::test]
async fn test_missing_setting_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("clipscore.db")).await.unwrap();

    delete_setting(&pool, "coherence_min_score").await.unwrap();

    let result = require_setting::<f64>(&pool, "coherence_min_score").await;
    assert!(matches!(result, Err(Error::Config(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_unparseable_setting_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("clipscore.db")).await.unwrap();

    set_setting(&pool, "duplicate_window", "twenty").await.unwrap();

    let result = require_setting::<i64>(&pool, "duplicate_window").await;
    assert!(matches!(result, Err(Error::Config(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_only_one_draft_session_per_user_and_video() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("clipscore.db")).await.unwrap();

    sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES ('u1', 'A', 'a@x', '2025-01-01T00:00:00.000Z')")
        .execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO videos (id, source_url, duration_seconds, created_at) VALUES ('v1', 'https://v/1', 60, '2025-01-01T00:00:00.000Z')")
        .execute(&pool).await.unwrap();

    let insert = "INSERT INTO evaluation_sessions (id, user_id, video_id, started_at, status) VALUES (?, 'u1', 'v1', '2025-01-01T00:00:00.000Z', ?)";
    sqlx::query(insert).bind("s1").bind("draft").execute(&pool).await.unwrap();

    let second_draft = sqlx::query(insert).bind("s2").bind("draft").execute(&pool).await;
    assert!(second_draft.is_err(), "Second draft for same (user, video) must be refused");

    // Terminal sessions do not count against the draft constraint
    sqlx::query(insert).bind("s3").bind("rejected").execute(&pool).await.unwrap();
}

#[tokio::test]
async fn test_ledger_refuses_second_reward_for_same_reference() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("clipscore.db")).await.unwrap();

    sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES ('u1', 'A', 'a@x', '2025-01-01T00:00:00.000Z')")
        .execute(&pool).await.unwrap();

    let insert = "INSERT INTO points_ledger (id, user_id, kind, ref_id, points, created_at) VALUES (?, 'u1', ?, 'e1', 20, '2025-01-01T00:00:00.000Z')";
    sqlx::query(insert).bind("l1").bind("evaluation_reward").execute(&pool).await.unwrap();

    let duplicate = sqlx::query(insert).bind("l2").bind("evaluation_reward").execute(&pool).await;
    assert!(duplicate.is_err());

    // Adjustments are not constrained
    sqlx::query(insert).bind("l3").bind("adjustment").execute(&pool).await.unwrap();
    sqlx::query(insert).bind("l4").bind("adjustment").execute(&pool).await.unwrap();
}
