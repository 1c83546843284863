//! View mode endpoints (admins only)

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::ViewContext;
use crate::AppState;

use super::extract::SessionScope;

#[derive(Debug, Deserialize)]
pub struct EnterViewModeRequest {
    pub company_id: String,
}

/// POST /api/view-mode
///
/// Switching companies while already viewing replaces the current view.
pub async fn enter_view_mode(
    State(state): State<AppState>,
    scope: SessionScope,
    Json(request): Json<EnterViewModeRequest>,
) -> ApiResult<Json<ViewContext>> {
    scope.require_admin()?;

    let company = state
        .directory
        .company(&request.company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("company {}", request.company_id)))?;

    let view = scope.0.enter_view_mode(&company);
    info!(
        session_id = %view.session_id,
        company_id = %view.company_id,
        admin_user_id = %scope.0.principal().user_id,
        "View mode entered"
    );
    Ok(Json(view))
}

/// DELETE /api/view-mode
///
/// Returns the context that was active, or `null` if already idle.
pub async fn exit_view_mode(scope: SessionScope) -> ApiResult<Json<Option<ViewContext>>> {
    scope.require_admin()?;

    let previous = scope.0.exit_view_mode();
    if let Some(view) = &previous {
        info!(session_id = %view.session_id, company_id = %view.company_id, "View mode exited");
    }
    Ok(Json(previous))
}

/// GET /api/view-mode
pub async fn current_view_mode(scope: SessionScope) -> ApiResult<Json<Option<ViewContext>>> {
    scope.require_admin()?;
    Ok(Json(scope.0.view_context()))
}
