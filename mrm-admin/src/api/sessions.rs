//! Session lifecycle endpoints
//!
//! Credentials are checked upstream by the authentication provider; these
//! handlers only open and close the server-side session for the principal
//! it vouched for.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::session::Principal;
use crate::AppState;

use super::extract::SessionScope;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

/// POST /api/sessions
pub async fn open_session(
    State(state): State<AppState>,
    Json(principal): Json<Principal>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    if principal.user_id.trim().is_empty() || principal.email.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id and email are required".to_string()));
    }

    let session = state.sessions.open(principal).await;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.session_id().to_string(),
        }),
    ))
}

/// DELETE /api/sessions/current
///
/// Ending the session also ends any view mode it held.
pub async fn close_session(
    State(state): State<AppState>,
    SessionScope(session): SessionScope,
) -> StatusCode {
    state.sessions.close(session.session_id()).await;
    StatusCode::NO_CONTENT
}
