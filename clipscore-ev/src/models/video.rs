//! Video catalog entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub source_url: String,
    pub thumb_url: Option<String>,
    pub duration_seconds: i64,
    pub topic: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
