//! HTTP surface over the reconciliation engine.
//!
//! Every handler fetches a fresh snapshot for the requested visitor, derives
//! the view it needs and discards the rest. Nothing is cached between
//! requests.

mod customers;
mod locations;

use std::{fmt::Display, str::FromStr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use fieldvisit_db::{DbError, FetchError, FieldDataSource};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

const RATE_LIMIT_REQUESTS: usize = 120;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Handler state: the injected data source and the per-stream fetch bound.
pub struct AppState<S> {
    pub source: Arc<S>,
    pub fetch_timeout: Duration,
}

// Manual impl: `S` itself need not be `Clone` behind the `Arc`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            fetch_timeout: self.fetch_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    pub(crate) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// Machine-readable failure class. Each maps to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    NotFound,
    RateLimited,
    /// A stream could not be loaded in time. Safe to retry.
    FetchFailed,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::FetchFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn validation(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.error.code.status(), Json(self)).into_response()
    }
}

/// Database detail is logged, never returned.
pub(crate) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    tracing::error!(%request_id, error = %error, "database query failed");
    ApiError::new(request_id, ErrorCode::InternalError, "database query failed")
}

pub(crate) fn map_fetch_error(request_id: String, error: &FetchError) -> ApiError {
    tracing::error!(%request_id, stream = %error.stream(), error = %error, "snapshot fetch failed");
    ApiError::new(
        request_id,
        ErrorCode::FetchFailed,
        "field data could not be loaded; retry the request",
    )
}

/// The visitor whose streams a request reads. Required on every customer
/// route.
pub(crate) fn require_owner(request_id: &str, raw: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation(request_id, "owner_id is required"))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(request_id, "owner_id must be a UUID"))
}

/// Blank or absent means the type's default; anything else must parse.
pub(crate) fn parse_or_default<T>(
    request_id: &str,
    name: &str,
    raw: Option<&str>,
) -> Result<T, ApiError>
where
    T: FromStr + Default,
    T::Err: Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(T::default()),
        Some(value) => value
            .parse::<T>()
            .map_err(|e| ApiError::validation(request_id, format!("{name}: {e}"))),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

fn customer_routes<S: FieldDataSource + 'static>(
    auth: AuthState,
    rate_limit: RateLimitState,
) -> Router<AppState<S>> {
    Router::new()
        .route("/api/v1/customers", get(customers::list_customers::<S>))
        .route(
            "/api/v1/customers/totals",
            get(customers::customer_totals::<S>),
        )
        .route("/api/v1/customers/{id}", get(customers::get_customer::<S>))
        .route(
            "/api/v1/locations/search",
            get(locations::search_locations::<S>),
        )
        // Auth runs first so rejected callers never spend rate budget.
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
}

/// Assemble the full router. `/api/v1/health` is public; everything else
/// goes through bearer auth and the per-visitor rate limit.
pub fn build_app<S: FieldDataSource + 'static>(
    state: AppState<S>,
    auth: AuthState,
    rate_limit: RateLimitState,
) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::<S>))
        .merge(customer_routes(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[must_use]
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

async fn health<S: FieldDataSource + 'static>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<ApiResponse<Health>>) {
    let (status, data) = match state.source.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Health {
                status: "ok",
                database: "ok",
                version: env!("CARGO_PKG_VERSION"),
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Health {
                    status: "degraded",
                    database: "unavailable",
                    version: env!("CARGO_PKG_VERSION"),
                },
            )
        }
    };

    (
        status,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
