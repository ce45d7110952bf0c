//! clipscore-ev library interface
//!
//! Evaluation rewards service: users watch short videos, submit scored
//! evaluations, and earn points subject to quotas and anti-abuse checks.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use std::sync::{Arc, Mutex};

use axum::Router;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::services::SharedRng;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Coherence baseline RNG
    pub rng: SharedRng,
    /// Token for admin and webhook routes; `None` disables the check
    pub admin_token: Option<Arc<str>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// `coherence_seed` fixes the RNG for reproducible runs
    pub fn new(db: SqlitePool, admin_token: Option<String>, coherence_seed: Option<u64>) -> Self {
        let rng = match coherence_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            db,
            rng: Arc::new(Mutex::new(rng)),
            admin_token: admin_token.filter(|t| !t.is_empty()).map(Arc::from),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let admin = api::admin_routes().layer(api::AdminAuthLayer {
        admin_token: state.admin_token.clone(),
    });

    Router::new()
        .merge(api::health_routes())
        .merge(api::session_routes())
        .merge(api::me_routes())
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
