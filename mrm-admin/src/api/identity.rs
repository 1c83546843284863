//! Effective identity endpoint

use axum::Json;

use crate::session::EffectiveIdentity;

use super::extract::SessionScope;

/// GET /api/identity
pub async fn get_identity(SessionScope(session): SessionScope) -> Json<EffectiveIdentity> {
    Json(session.effective_identity())
}
