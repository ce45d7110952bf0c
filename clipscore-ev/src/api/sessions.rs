//! Evaluation session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::error::ApiResult;
use crate::models::EvaluationSession;
use crate::services::{SessionService, StartOutcome, Submission, SubmissionOutcome, SubmissionPipeline};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub video_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub outcome: &'static str,
    pub session: EvaluationSession,
}

#[derive(Debug, Deserialize)]
pub struct WatchTimeRequest {
    pub watch_time_seconds: i64,
}

/// POST /api/sessions
pub async fn start_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<Response> {
    let service = SessionService::new(state.db.clone());
    let response = match service.start(user_id, request.video_id).await? {
        StartOutcome::Started(session) => (
            StatusCode::CREATED,
            Json(SessionResponse { outcome: "started", session }),
        )
            .into_response(),
        StartOutcome::Existing(session) => (
            StatusCode::OK,
            Json(SessionResponse { outcome: "resumed", session }),
        )
            .into_response(),
        StartOutcome::QuotaExceeded(decision) => {
            (StatusCode::TOO_MANY_REQUESTS, Json(decision)).into_response()
        }
    };
    Ok(response)
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<EvaluationSession>> {
    let session = SessionService::new(state.db.clone()).get(user_id, session_id).await?;
    Ok(Json(session))
}

/// PUT /api/sessions/:id/watch-time
pub async fn report_watch_time(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<Uuid>,
    Json(request): Json<WatchTimeRequest>,
) -> ApiResult<Json<EvaluationSession>> {
    let session = SessionService::new(state.db.clone())
        .record_watch_time(user_id, session_id, request.watch_time_seconds)
        .await?;
    Ok(Json(session))
}

/// POST /api/sessions/:id/submit
///
/// Business-rule rejections are a normal 200 response with
/// `outcome: "rejected"`.
pub async fn submit_evaluation(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<Uuid>,
    Json(submission): Json<Submission>,
) -> ApiResult<Json<SubmissionOutcome>> {
    let pipeline = SubmissionPipeline::new(state.db.clone(), state.rng.clone());
    let outcome = pipeline.submit(user_id, session_id, &submission).await?;
    Ok(Json(outcome))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/watch-time", put(report_watch_time))
        .route("/api/sessions/:id/submit", post(submit_evaluation))
}
