use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id for one request, echoed back as `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Who may trigger jobs.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// Development without configured keys: every caller is let through.
    Open,
    Tokens(Arc<HashSet<String>>),
}

impl AuthState {
    /// Blank entries are ignored. Running without any key is only accepted in
    /// development.
    ///
    /// # Errors
    ///
    /// Fails outside development when no usable key is configured.
    pub fn from_keys(keys: &[String], is_development: bool) -> anyhow::Result<Self> {
        let tokens: HashSet<String> = keys
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_owned)
            .collect();

        match (tokens.is_empty(), is_development) {
            (false, _) => Ok(Self::Tokens(Arc::new(tokens))),
            (true, true) => {
                tracing::warn!("no GEARSAFE_WORKER_API_KEYS configured; job endpoints are open");
                Ok(Self::Open)
            }
            (true, false) => anyhow::bail!(
                "GEARSAFE_WORKER_API_KEYS must list at least one bearer token outside development"
            ),
        }
    }

    fn admits(&self, headers: &HeaderMap) -> bool {
        match self {
            Self::Open => true,
            Self::Tokens(tokens) => bearer_token(headers).is_some_and(|t| tokens.contains(t)),
        }
    }
}

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    let echo = HeaderValue::from_str(&id).ok();
    req.extensions_mut().insert(RequestId(id));

    let mut res = next.run(req).await;
    if let Some(echo) = echo {
        res.headers_mut().insert(X_REQUEST_ID.clone(), echo);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if auth.admits(req.headers()) {
        return next.run(req).await;
    }
    let id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    ApiError::new(id, ErrorCode::Unauthorized, "missing or invalid bearer token").into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
