//! Branding endpoints
//!
//! Both act on the effective company: the viewed company in view mode, the
//! user's own company otherwise. Updates made while viewing are audited.

use axum::{extract::State, Json};
use serde_json::Value;

use mrm_common::db::{BrandingUpdate, CompanyBranding};

use crate::audit::{LogParams, RequestMeta};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::extract::SessionScope;

fn effective_company(scope: &SessionScope) -> ApiResult<String> {
    scope
        .0
        .effective_identity()
        .company_id
        .ok_or_else(|| ApiError::NotFound("no company in scope".to_string()))
}

/// GET /api/branding
pub async fn get_branding(
    State(state): State<AppState>,
    scope: SessionScope,
) -> ApiResult<Json<CompanyBranding>> {
    let company_id = effective_company(&scope)?;
    let branding = state
        .directory
        .branding(&company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("branding for company {}", company_id)))?;
    Ok(Json(branding))
}

/// PUT /api/branding
pub async fn update_branding(
    State(state): State<AppState>,
    scope: SessionScope,
    meta: RequestMeta,
    Json(update): Json<BrandingUpdate>,
) -> ApiResult<Json<CompanyBranding>> {
    let company_id = effective_company(&scope)?;

    let params = LogParams::new("update_branding", "branding")
        .with_resource_id(company_id.clone())
        .with_detail("changes", serde_json::to_value(&update).unwrap_or(Value::Null));

    let branding = state
        .logger
        .wrap_action(&scope.0, &meta, params, || {
            state.directory.update_branding(&company_id, &update)
        })
        .await?;

    Ok(Json(branding))
}
