//! Database models shared across services

use serde::{Deserialize, Serialize};

/// Client company (tenant)
///
/// Owned by the primary data store; admin services only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// User whose identity stands in for the company during admin preview
    pub representative_user_id: String,
}

/// Per-company portal branding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompanyBranding {
    pub company_id: String,
    pub display_name: String,
    pub primary_color: String,
    pub logo_url: Option<String>,
}

/// Partial branding update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingUpdate {
    pub display_name: Option<String>,
    pub primary_color: Option<String>,
    pub logo_url: Option<String>,
}

impl BrandingUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.primary_color.is_none() && self.logo_url.is_none()
    }
}
