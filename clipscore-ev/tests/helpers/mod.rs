//! Shared fixtures for clipscore-ev integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use clipscore_common::db::init_database;
use clipscore_ev::db;
use clipscore_ev::db::users::NewUser;
use clipscore_ev::db::videos::NewVideo;
use clipscore_ev::models::{CriterionScores, EvaluationSession, Role};
use clipscore_ev::services::{
    SessionService, SharedRng, StartOutcome, Submission, SubmissionPipeline,
};

pub const VIDEO_DURATION: i64 = 60;

/// Temporary database with default settings; dropped with the test
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("test.db")).await.unwrap();
    TestDb { pool, _dir: dir }
}

pub fn seeded_rng(seed: u64) -> SharedRng {
    Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))
}

pub async fn create_user(pool: &SqlitePool, name: &str) -> Uuid {
    db::users::create_user(
        pool,
        &NewUser {
            name: name.to_string(),
            email: format!("{}-{}@example.com", name, Uuid::new_v4()),
            role: Role::User,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn create_video(pool: &SqlitePool) -> Uuid {
    db::videos::insert_video(
        pool,
        &NewVideo {
            source_url: format!("https://videos.example.com/{}.mp4", Uuid::new_v4()),
            thumb_url: None,
            duration_seconds: VIDEO_DURATION,
            topic: Some("marketing".to_string()),
        },
    )
    .await
    .unwrap()
    .id
}

/// Start a fresh session on a new video and report `watch_time` seconds
pub async fn watched_session(pool: &SqlitePool, user_id: Uuid, watch_time: i64) -> EvaluationSession {
    let video_id = create_video(pool).await;
    let service = SessionService::new(pool.clone());
    let session = match service.start(user_id, video_id).await.unwrap() {
        StartOutcome::Started(session) => session,
        other => panic!("expected a new session, got {:?}", other),
    };
    if watch_time > 0 {
        service
            .record_watch_time(user_id, session.id, watch_time)
            .await
            .unwrap()
    } else {
        session
    }
}

pub fn submission(hook: i64, retention: i64, clarity: i64, cta: i64, text: &str) -> Submission {
    Submission {
        scores: CriterionScores { hook, retention, clarity, cta },
        insight_text: text.to_string(),
    }
}

/// Moderate scores with text that never triggers a coherence penalty
pub fn coherent(text: &str) -> Submission {
    submission(7, 7, 7, 6, text)
}

pub fn pipeline(pool: &SqlitePool) -> SubmissionPipeline {
    SubmissionPipeline::new(pool.clone(), seeded_rng(42))
}

pub async fn reward_count(pool: &SqlitePool, user_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM points_ledger WHERE user_id = ? AND kind = 'evaluation_reward'",
    )
    .bind(user_id.to_string())
    .fetch_one(pool)
    .await
    .unwrap()
}
