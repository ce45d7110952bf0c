//! Endpoints describing the calling user

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::db;
use crate::error::ApiResult;
use crate::models::{LedgerEntry, PlanTier, QuotaCounts, UserAccount, UserMissionView};
use crate::services::{check_quota, EvaluationPolicy};
use crate::AppState;

const DEFAULT_LEDGER_PAGE: i64 = 50;
const MAX_LEDGER_PAGE: i64 = 500;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub entries: Vec<LedgerEntry>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub plan_tier: PlanTier,
    pub usage: QuotaCounts,
    pub open_drafts: i64,
    pub limits: QuotaCounts,
    pub exceeded: bool,
    pub quota_reset_daily_at: Option<DateTime<Utc>>,
    pub quota_reset_weekly_at: Option<DateTime<Utc>>,
}

/// GET /api/me
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<UserAccount>> {
    Ok(Json(db::users::require_user(&state.db, user_id).await?))
}

/// GET /api/me/balance
pub async fn get_balance(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<BalanceResponse>> {
    db::users::require_user(&state.db, user_id).await?;
    let balance = db::ledger::balance(&state.db, user_id).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

/// GET /api/me/ledger?limit=&offset=
pub async fn get_ledger(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Json<LedgerResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LEDGER_PAGE).clamp(1, MAX_LEDGER_PAGE);
    let offset = query.offset.unwrap_or(0).max(0);
    let entries = db::ledger::list_entries(&state.db, user_id, limit, offset).await?;
    Ok(Json(LedgerResponse { entries, limit, offset }))
}

/// GET /api/me/quota
pub async fn get_quota(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<QuotaResponse>> {
    let policy = EvaluationPolicy::load(&state.db).await?;
    let user = db::users::require_user(&state.db, user_id).await?;
    let open_drafts = db::sessions::count_open_drafts(&state.db, user_id).await?;
    let decision = check_quota(&user, &policy.plan_limits, open_drafts);

    Ok(Json(QuotaResponse {
        plan_tier: user.effective_tier(),
        usage: user.quota_usage(),
        open_drafts,
        limits: policy.plan_limits.for_tier(user.effective_tier()),
        exceeded: !decision.is_allowed(),
        quota_reset_daily_at: user.quota_reset_daily_at,
        quota_reset_weekly_at: user.quota_reset_weekly_at,
    }))
}

/// GET /api/me/missions
pub async fn get_missions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<Vec<UserMissionView>>> {
    Ok(Json(db::missions::list_user_missions(&state.db, user_id).await?))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(get_profile))
        .route("/api/me/balance", get(get_balance))
        .route("/api/me/ledger", get(get_ledger))
        .route("/api/me/quota", get(get_quota))
        .route("/api/me/missions", get(get_missions))
}
