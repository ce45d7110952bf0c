//! Caller identity and admin authorization
//!
//! User identity arrives in `X-User-Id`, set by the upstream gateway after it
//! authenticated the caller. Admin and webhook routes are guarded by a
//! shared token in `X-Api-Key`; with no token configured the check is
//! disabled.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower::{Layer, Service};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated caller, extracted from `X-User-Id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Malformed X-User-Id header".to_string()))?;

        Uuid::parse_str(raw.trim())
            .map(CurrentUser)
            .map_err(|_| ApiError::Unauthorized(format!("Invalid X-User-Id: {}", raw)))
    }
}

/// Tower layer requiring `X-Api-Key` to match the admin token
#[derive(Clone)]
pub struct AdminAuthLayer {
    pub admin_token: Option<Arc<str>>,
}

impl<S> Layer<S> for AdminAuthLayer {
    type Service = AdminAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminAuthMiddleware {
            inner,
            admin_token: self.admin_token.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdminAuthMiddleware<S> {
    inner: S,
    admin_token: Option<Arc<str>>,
}

impl<S> Service<Request> for AdminAuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let admin_token = self.admin_token.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(expected) = admin_token else {
                return inner.call(request).await;
            };

            let provided = request
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok());

            if provided != Some(&*expected) {
                tracing::warn!(path = %request.uri().path(), "Rejected admin request: bad API key");
                return Ok(forbidden());
            }

            inner.call(request).await
        })
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": {
                "code": "FORBIDDEN",
                "message": "Missing or invalid X-Api-Key",
            }
        })),
    )
        .into_response()
}
