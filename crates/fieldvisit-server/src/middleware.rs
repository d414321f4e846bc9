use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fieldvisit_core::{AppConfig, Environment};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;
/// Upper bound on distinct clients tracked within one window.
const MAX_TRACKED_CLIENTS: usize = 10_000;
/// Budget shared by every client that arrives once the table is full.
const OVERFLOW_CLIENT: &str = "overflow";
const ANONYMOUS_CLIENT: &str = "anonymous";

/// Correlates log lines and the response envelope for one request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer keys accepted on protected routes. Disabled means every request
/// passes.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<Vec<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Auth settings from `FIELDVISIT_API_KEYS`.
    ///
    /// Development without keys runs open; any other environment refuses to
    /// start without at least one key.
    ///
    /// # Errors
    ///
    /// Returns an error outside development when no API keys are configured.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if !config.api_keys.is_empty() {
            return Ok(Self::with_keys(config.api_keys.clone()));
        }
        if config.env != Environment::Development {
            anyhow::bail!("FIELDVISIT_API_KEYS must be set when FIELDVISIT_ENV={}", config.env);
        }
        tracing::warn!("no API keys configured; protected routes are open in development");
        Ok(Self::disabled())
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            api_keys: Arc::new(Vec::new()),
            enabled: false,
        }
    }

    #[must_use]
    pub fn with_keys(keys: Vec<String>) -> Self {
        Self {
            enabled: !keys.is_empty(),
            api_keys: Arc::new(keys),
        }
    }

    fn allows(&self, token: &str) -> bool {
        // Checks every key so timing does not reveal which one matched.
        self.api_keys.iter().fold(false, |hit, key| {
            hit | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request budget, counted separately per visitor.
///
/// Requests are attributed to the visitor UUID in `owner_id`, then to the
/// bearer token, so one visitor's refresh loop cannot exhaust another's
/// budget. At most `max_clients` windows are tracked; once the table is full,
/// new clients share a single overflow budget until windows expire.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    max_clients: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            max_clients: MAX_TRACKED_CLIENTS,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Count one request for `client`; false when its budget is spent.
    async fn admit(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let tracked = if windows.contains_key(client) || windows.len() < self.max_clients {
            client
        } else {
            OVERFLOW_CLIENT
        };
        let entry = windows.entry(tracked.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Who a request is charged to. `owner_id` is decoded and parsed the same
/// way the handlers read it, so spellings of one UUID share a budget.
fn client_key(req: &Request) -> String {
    let owner = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(params)| {
            params
                .get("owner_id")
                .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        });
    if let Some(owner) = owner {
        return format!("owner:{owner}");
    }
    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) => format!("key:{token}"),
        None => ANONYMOUS_CLIENT.to_string(),
    }
}

fn current_request_id(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone())
}

/// Reuse a caller-supplied id when it is short printable ASCII.
fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| raw.to_string())
}

/// Tags the request with a [`RequestId`] and echoes it in `x-request-id`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = incoming_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => {
            let request_id = current_request_id(&req);
            tracing::debug!(%request_id, "rejected request without a valid bearer token");
            ApiError::new(request_id, ErrorCode::Unauthorized, "missing or invalid bearer token")
                .into_response()
        }
    }
}

pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    if rate_limit.admit(&client).await {
        return next.run(req).await;
    }

    let request_id = current_request_id(&req);
    tracing::warn!(%request_id, %client, "rate limit exceeded");
    ApiError::new(
        request_id,
        ErrorCode::RateLimited,
        "too many requests; slow down and retry",
    )
    .into_response()
}

/// The token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let raw = value?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
