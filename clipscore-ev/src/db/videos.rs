//! Video catalog persistence

use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor};
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Error, Result};

use crate::models::Video;

/// Fields supplied when adding a video
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub source_url: String,
    pub thumb_url: Option<String>,
    pub duration_seconds: i64,
    pub topic: Option<String>,
}

fn video_from_row(row: &SqliteRow) -> Result<Video> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Video {
        id: uuid_utils::from_db(&id)?,
        source_url: row.try_get("source_url")?,
        thumb_url: row.try_get("thumb_url")?,
        duration_seconds: row.try_get("duration_seconds")?,
        topic: row.try_get("topic")?,
        active: status == "active",
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert_video<'e, E>(executor: E, new_video: &NewVideo) -> Result<Video>
where
    E: SqliteExecutor<'e>,
{
    if new_video.duration_seconds <= 0 {
        return Err(Error::InvalidInput(format!(
            "Video duration must be positive, got {}",
            new_video.duration_seconds
        )));
    }
    if new_video.source_url.trim().is_empty() {
        return Err(Error::InvalidInput("Video source_url must not be empty".to_string()));
    }

    let video = Video {
        id: uuid_utils::generate(),
        source_url: new_video.source_url.trim().to_string(),
        thumb_url: new_video.thumb_url.clone(),
        duration_seconds: new_video.duration_seconds,
        topic: new_video.topic.clone(),
        active: true,
        created_at: time::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO videos (id, source_url, thumb_url, duration_seconds, topic, status, created_at)
        VALUES (?, ?, ?, ?, ?, 'active', ?)
        "#,
    )
    .bind(video.id.to_string())
    .bind(&video.source_url)
    .bind(&video.thumb_url)
    .bind(video.duration_seconds)
    .bind(&video.topic)
    .bind(time::to_db(video.created_at))
    .execute(executor)
    .await?;

    Ok(video)
}

pub async fn load_video<'e, E>(executor: E, video_id: Uuid) -> Result<Option<Video>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT id, source_url, thumb_url, duration_seconds, topic, status, created_at
        FROM videos WHERE id = ?
        "#,
    )
    .bind(video_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(video_from_row).transpose()
}
