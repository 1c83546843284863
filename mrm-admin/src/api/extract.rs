//! Session middleware and request extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::USER_AGENT, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::audit::RequestMeta;
use crate::error::ApiError;
use crate::session::SessionContext;
use crate::AppState;

/// Header carrying the session id issued by `POST /api/sessions`
pub const SESSION_HEADER: &str = "x-session-id";

/// Resolve the session header and attach the live [`SessionContext`]
///
/// Returns 401 when the header is missing or names no live session.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_id = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", SESSION_HEADER)))?;

    let session = state.sessions.get(&session_id).await.ok_or_else(|| {
        debug!(session_id = %session_id, "Unknown or expired session");
        ApiError::Unauthorized("session not found or expired".to_string())
    })?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// The current request's session
///
/// Only valid behind [`session_middleware`]. Used anywhere else it fails with
/// a configuration error rather than acting without a scope.
#[derive(Debug, Clone)]
pub struct SessionScope(pub Arc<SessionContext>);

impl SessionScope {
    /// Reject non-admin sessions
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<SessionContext>>()
            .cloned()
            .map(SessionScope)
            .ok_or_else(|| {
                mrm_common::Error::Config(
                    "session scope requested on a route without session middleware".to_string(),
                )
                .into()
            })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        Ok(RequestMeta::new(user_agent, parts.uri.path()))
    }
}
