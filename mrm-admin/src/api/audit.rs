//! Audit dashboard endpoints (admins only)

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::audit::query::{fetch_recent, fetch_summary};
use crate::audit::{AuditFilter, AuditLogEntry, AuditSummary, DateRange};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::extract::SessionScope;

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// One of `all`, `bysession`, `bycompany`, `highrisk`
    pub filter: Option<String>,
    pub session_id: Option<String>,
    pub company_id: Option<String>,
}

impl AuditLogsQuery {
    fn range(&self) -> DateRange {
        DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    fn filter(&self) -> ApiResult<AuditFilter> {
        match self.filter.as_deref().unwrap_or("all") {
            "all" => Ok(AuditFilter::All),
            "highrisk" => Ok(AuditFilter::HighRisk),
            "bysession" => self
                .session_id
                .clone()
                .map(AuditFilter::BySession)
                .ok_or_else(|| ApiError::BadRequest("filter=bysession needs session_id".to_string())),
            "bycompany" => self
                .company_id
                .clone()
                .map(AuditFilter::ByCompany)
                .ok_or_else(|| ApiError::BadRequest("filter=bycompany needs company_id".to_string())),
            other => Err(ApiError::BadRequest(format!("unknown filter: {}", other))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditSummaryQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub admin_user_id: Option<String>,
}

/// GET /api/audit/logs
///
/// Newest-first page of recent entries, narrowed by `filter`.
pub async fn audit_logs(
    State(state): State<AppState>,
    scope: SessionScope,
    Query(query): Query<AuditLogsQuery>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    scope.require_admin()?;
    let filter = query.filter()?;

    let entries = fetch_recent(state.audit_store.as_ref(), &query.range()).await?;
    Ok(Json(filter.apply(entries)))
}

/// GET /api/audit/summary
pub async fn audit_summary(
    State(state): State<AppState>,
    scope: SessionScope,
    Query(query): Query<AuditSummaryQuery>,
) -> ApiResult<Json<AuditSummary>> {
    scope.require_admin()?;

    let range = DateRange {
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let summary = fetch_summary(
        state.audit_store.as_ref(),
        &range,
        query.admin_user_id.as_deref(),
    )
    .await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_all() {
        assert_eq!(AuditLogsQuery::default().filter().unwrap(), AuditFilter::All);
    }

    #[test]
    fn test_filter_by_session_needs_id() {
        let query = AuditLogsQuery {
            filter: Some("bysession".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(ApiError::BadRequest(_))));

        let query = AuditLogsQuery {
            filter: Some("bysession".to_string()),
            session_id: Some("s1".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter().unwrap(), AuditFilter::BySession("s1".to_string()));
    }

    #[test]
    fn test_unknown_filter_rejected() {
        let query = AuditLogsQuery {
            filter: Some("everything".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(ApiError::BadRequest(_))));
    }
}
