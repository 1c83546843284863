//! Effective identity: the user/company data paths should act as
//!
//! While an admin is viewing a company, data is scoped to that company's
//! representative user. Otherwise it is the signed-in user's own scope.

use serde::Serialize;

use mrm_common::{Error, Result};

use super::context::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveIdentity {
    pub user_id: String,
    pub company_id: Option<String>,
    pub is_admin_preview: bool,
}

impl SessionContext {
    pub fn effective_identity(&self) -> EffectiveIdentity {
        match self.view_context() {
            Some(view) => EffectiveIdentity {
                user_id: view.representative_user_id,
                company_id: Some(view.company_id),
                is_admin_preview: true,
            },
            None => EffectiveIdentity {
                user_id: self.principal().user_id.clone(),
                company_id: self.principal().company_id.clone(),
                is_admin_preview: false,
            },
        }
    }
}

/// Resolve the effective identity for an optional session scope
///
/// A missing scope is a wiring mistake, not a user error, so it surfaces as
/// a configuration error instead of silently falling back.
pub fn effective_identity(scope: Option<&SessionContext>) -> Result<EffectiveIdentity> {
    scope.map(SessionContext::effective_identity).ok_or_else(|| {
        Error::Config("effective identity requested outside a session scope".to_string())
    })
}
