//! Audit log record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::risk::RiskLevel;

/// One persisted audit record
///
/// Rows are append-only; nothing in this crate updates or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub admin_user_id: String,
    pub admin_email: String,
    pub session_id: String,
    pub action_type: String,
    pub company_id: String,
    pub company_name: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub action_details: Map<String, Value>,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub request_path: String,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

/// Record handed to the store; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEntry {
    pub admin_user_id: String,
    pub admin_email: String,
    pub session_id: String,
    pub action_type: String,
    pub company_id: String,
    pub company_name: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub action_details: Map<String, Value>,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub request_path: String,
    pub risk_level: RiskLevel,
}

/// Caller-supplied description of an action to audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogParams {
    pub action_type: String,
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub action_details: Map<String, Value>,
    /// Explicit risk level; replaces the one derived from `action_type`
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
}

impl LogParams {
    pub fn new(action_type: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            action_details: Map::new(),
            risk_level: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.action_details.insert(key.into(), value.into());
        self
    }

    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_fields() {
        let params = LogParams::new("delete_royalty", "royalty")
            .with_resource_id("r9")
            .with_detail("statement", "2026-Q1")
            .with_risk_level(RiskLevel::Critical);

        assert_eq!(params.action_type, "delete_royalty");
        assert_eq!(params.resource_type, "royalty");
        assert_eq!(params.resource_id.as_deref(), Some("r9"));
        assert_eq!(params.action_details["statement"], json!("2026-Q1"));
        assert_eq!(params.risk_level, Some(RiskLevel::Critical));
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: LogParams =
            serde_json::from_value(json!({"action_type": "read_x", "resource_type": "x"})).unwrap();
        assert!(params.resource_id.is_none());
        assert!(params.action_details.is_empty());
        assert!(params.risk_level.is_none());
    }
}
