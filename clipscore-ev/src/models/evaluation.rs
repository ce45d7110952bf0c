//! Accepted evaluation payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clipscore_common::{Error, Result};

/// Inclusive bounds for every criterion score
pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 10;

/// The four criterion scores of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub hook: i64,
    pub retention: i64,
    pub clarity: i64,
    pub cta: i64,
}

impl CriterionScores {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("hook", self.hook),
            ("retention", self.retention),
            ("clarity", self.clarity),
            ("cta", self.cta),
        ];
        for (name, value) in fields {
            if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "Score '{}' must be between {} and {}, got {}",
                    name, SCORE_MIN, SCORE_MAX, value
                )));
            }
        }
        Ok(())
    }
}

/// Immutable record created together with a `validated` session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub scores: CriterionScores,
    pub insight_text: String,
    pub insight_hash: String,
    pub coherence_score: f64,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
}
