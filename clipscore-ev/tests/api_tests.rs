//! HTTP API tests driven through the router with `oneshot`

mod helpers;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use clipscore_common::db::set_setting;
use clipscore_ev::{build_router, AppState};

use helpers::*;

const ADMIN_TOKEN: &str = "test-admin-token";

fn app(tdb: &TestDb) -> Router {
    build_router(AppState::new(tdb.pool.clone(), Some(ADMIN_TOKEN.to_string()), Some(42)))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    admin: bool,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.to_string());
    }
    if admin {
        builder = builder.header("X-Api-Key", ADMIN_TOKEN);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn admin_create_user(app: &Router, name: &str) -> Uuid {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/admin/users",
        None,
        true,
        Some(json!({ "name": name, "email": format!("{}@example.com", name) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn admin_create_video(app: &Router) -> Uuid {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/admin/videos",
        None,
        true,
        Some(json!({ "source_url": "https://videos.example.com/a.mp4", "duration_seconds": 60 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn start_and_watch(app: &Router, user: Uuid, watch_time: i64) -> String {
    let video = admin_create_video(app).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/sessions",
        Some(user),
        false,
        Some(json!({ "video_id": video })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["outcome"], "started");
    let session_id = body["session"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        Method::PUT,
        &format!("/api/sessions/{}/watch-time", session_id),
        Some(user),
        false,
        Some(json!({ "watch_time_seconds": watch_time })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["watch_time_seconds"], watch_time);
    session_id
}

fn submit_body(text: &str) -> Value {
    json!({
        "scores": { "hook": 7, "retention": 7, "clarity": 7, "cta": 6 },
        "insight_text": text,
    })
}

#[tokio::test]
async fn test_health() {
    let tdb = test_db().await;
    let (status, body) = send(&app(&tdb), Method::GET, "/health", None, false, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "clipscore-ev");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_user_routes_require_identity() {
    let tdb = test_db().await;
    let app = app(&tdb);

    let (status, body) = send(&app, Method::GET, "/api/me/balance", None, false, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/me/balance")
        .header("X-User-Id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_api_key() {
    let tdb = test_db().await;
    let app = app(&tdb);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/users",
        None,
        false,
        Some(json!({ "name": "eve", "email": "eve@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    admin_create_user(&app, "eve").await;
}

#[tokio::test]
async fn test_admin_check_disabled_without_token() {
    let tdb = test_db().await;
    let app = build_router(AppState::new(tdb.pool.clone(), None, Some(1)));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/quota/sweep",
        None,
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_full_submission_flow() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "flow").await;
    let session_id = start_and_watch(&app, user, 30).await;

    let uri = format!("/api/sessions/{}/submit", session_id);
    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(user),
        false,
        Some(submit_body("Tight edit with a clear payoff")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["outcome"], "accepted");
    assert_eq!(body["points_awarded"], 20);
    assert_eq!(body["session_id"], session_id.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(user),
        false,
        Some(submit_body("Trying again")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SESSION_STATE");

    let (_, body) = send(&app, Method::GET, "/api/me/balance", Some(user), false, None).await;
    assert_eq!(body["balance"], 20);

    let (_, body) = send(&app, Method::GET, "/api/me/quota", Some(user), false, None).await;
    assert_eq!(body["usage"]["daily"], 1);
    assert_eq!(body["limits"]["daily"], 10);
    assert_eq!(body["exceeded"], false);

    let (_, body) = send(&app, Method::GET, "/api/me/ledger", Some(user), false, None).await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["entries"][0]["kind"], "evaluation_reward");

    let (_, body) = send(&app, Method::GET, "/api/me", Some(user), false, None).await;
    assert_eq!(body["approval_rate"], 1.0);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/sessions/{}", session_id),
        Some(user),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "validated");
}

#[tokio::test]
async fn test_rejection_is_a_normal_response() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "hasty").await;
    let session_id = start_and_watch(&app, user, 15).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/submit", session_id),
        Some(user),
        false,
        Some(submit_body("Quick take")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["reason"], "watch_time");
    assert!(body["notes"].as_array().is_some());
}

#[tokio::test]
async fn test_invalid_scores_are_bad_request() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "wild").await;
    let session_id = start_and_watch(&app, user, 30).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/submit", session_id),
        Some(user),
        false,
        Some(json!({
            "scores": { "hook": 12, "retention": 7, "clarity": 7, "cta": 7 },
            "insight_text": "off the charts",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_quota_exceeded_on_start() {
    let tdb = test_db().await;
    set_setting(&tdb.pool, "plan_free_daily_quota", "1").await.unwrap();
    let app = app(&tdb);
    let user = admin_create_user(&app, "limited").await;

    let session_id = start_and_watch(&app, user, 30).await;
    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/submit", session_id),
        Some(user),
        false,
        Some(submit_body("Used my only slot")),
    )
    .await;
    assert_eq!(body["outcome"], "accepted");

    let video = admin_create_video(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(user),
        false,
        Some(json!({ "video_id": video })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["outcome"], "quota_exceeded");
    assert_eq!(body["plan_tier"], "free");
    assert_eq!(body["usage"]["daily"], 1);
    assert_eq!(body["limits"]["daily"], 1);
}

#[tokio::test]
async fn test_existing_draft_is_resumed() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "resumer").await;
    let video = admin_create_video(&app).await;
    let body = json!({ "video_id": video });

    let (status, first) =
        send(&app, Method::POST, "/api/sessions", Some(user), false, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) =
        send(&app, Method::POST, "/api/sessions", Some(user), false, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["outcome"], "resumed");
    assert_eq!(first["session"]["id"], second["session"]["id"]);
}

#[tokio::test]
async fn test_ledger_admin_endpoints() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "adjusted").await;

    let (status, entry) = send(
        &app,
        Method::POST,
        "/api/admin/ledger/adjustments",
        None,
        true,
        Some(json!({ "user_id": user, "points": 25, "note": "contest prize" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", entry);
    let entry_id = entry["id"].as_str().unwrap().to_string();

    let reversal_uri = format!("/api/admin/ledger/{}/reversal", entry_id);
    let (status, reversal) = send(
        &app,
        Method::POST,
        &reversal_uri,
        None,
        true,
        Some(json!({ "note": "duplicate prize" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reversal["points"], -25);

    let (status, body) =
        send(&app, Method::POST, &reversal_uri, None, true, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = send(&app, Method::GET, "/api/me/balance", Some(user), false, None).await;
    assert_eq!(body["balance"], 0);
}

#[tokio::test]
async fn test_payment_webhook_upgrades_plan() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "payer").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/webhooks/payment",
        None,
        true,
        Some(json!({
            "event": "payment.succeeded",
            "user_id": user,
            "product": "pro_month",
            "provider": "stripe",
            "amount": 999,
            "external_id": "evt_api_1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["result"], "activated");
    assert_eq!(body["plan_tier"], "pro");

    let (_, body) = send(&app, Method::GET, "/api/me/quota", Some(user), false, None).await;
    assert_eq!(body["plan_tier"], "pro");
    assert_eq!(body["limits"]["daily"], 50);
}

#[tokio::test]
async fn test_missing_policy_is_configuration_error() {
    let tdb = test_db().await;
    let app = app(&tdb);
    let user = admin_create_user(&app, "misconfigured").await;
    clipscore_common::db::delete_setting(&tdb.pool, "plan_free_daily_quota")
        .await
        .unwrap();

    let (status, body) = send(&app, Method::GET, "/api/me/quota", Some(user), false, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
}
