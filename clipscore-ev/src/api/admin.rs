//! Operator endpoints: catalog, ledger corrections, quota sweep, billing webhook

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::db::missions::NewMission;
use crate::db::users::NewUser;
use crate::db::videos::NewVideo;
use crate::error::ApiResult;
use crate::models::{LedgerEntry, Mission, MissionMetric, Role, UserAccount, Video};
use crate::services::{self, PaymentEvent, PlanChange, SweepReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub source_url: String,
    pub thumb_url: Option<String>,
    pub duration_seconds: i64,
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMissionRequest {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_metric")]
    pub metric: MissionMetric,
    pub target: i64,
    pub bonus_points: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_metric() -> MissionMetric {
    MissionMetric::ValidEvaluations
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub user_id: Uuid,
    pub points: i64,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReversalRequest {
    pub note: Option<String>,
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserAccount>)> {
    let user = db::users::create_user(
        &state.db,
        &NewUser {
            name: request.name,
            email: request.email,
            role: request.role,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/admin/videos
pub async fn create_video(
    State(state): State<AppState>,
    Json(request): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    let video = db::videos::insert_video(
        &state.db,
        &NewVideo {
            source_url: request.source_url,
            thumb_url: request.thumb_url,
            duration_seconds: request.duration_seconds,
            topic: request.topic,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(video)))
}

/// POST /api/admin/missions
pub async fn create_mission(
    State(state): State<AppState>,
    Json(request): Json<CreateMissionRequest>,
) -> ApiResult<(StatusCode, Json<Mission>)> {
    let mission = db::missions::insert_mission(
        &state.db,
        &NewMission {
            code: request.code,
            title: request.title,
            description: request.description,
            metric: request.metric,
            target: request.target,
            bonus_points: request.bonus_points,
            active: request.active,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(mission)))
}

/// POST /api/admin/ledger/adjustments
pub async fn create_adjustment(
    State(state): State<AppState>,
    Json(request): Json<AdjustmentRequest>,
) -> ApiResult<(StatusCode, Json<LedgerEntry>)> {
    let entry =
        services::ledger::adjust(&state.db, request.user_id, request.points, request.note).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/admin/ledger/:entry_id/reversal
pub async fn reverse_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<ReversalRequest>,
) -> ApiResult<(StatusCode, Json<LedgerEntry>)> {
    let entry = services::ledger::reverse(&state.db, entry_id, request.note).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/admin/quota/sweep
pub async fn sweep_quotas(State(state): State<AppState>) -> ApiResult<Json<SweepReport>> {
    let report = services::run_sweep(&state.db, clipscore_common::time::now()).await?;
    Ok(Json(report))
}

/// POST /api/webhooks/payment
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(event): Json<PaymentEvent>,
) -> ApiResult<Json<PlanChange>> {
    let change = services::plans::apply_payment_event(&state.db, &event).await?;
    Ok(Json(change))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", post(create_user))
        .route("/api/admin/videos", post(create_video))
        .route("/api/admin/missions", post(create_mission))
        .route("/api/admin/ledger/adjustments", post(create_adjustment))
        .route("/api/admin/ledger/:entry_id/reversal", post(reverse_entry))
        .route("/api/admin/quota/sweep", post(sweep_quotas))
        .route("/api/webhooks/payment", post(payment_webhook))
}
