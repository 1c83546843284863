//! Read side of the audit trail
//!
//! Dashboards fetch a capped, newest-first page of entries and narrow it with
//! client-side filters; summaries are aggregated by the store over the full
//! range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mrm_common::Result;

use super::entry::AuditLogEntry;
use super::store::{AuditStore, DateRange};

/// Page size for recent-entry queries
pub const RECENT_LIMIT: i64 = 500;

/// Predicate over an already-fetched page of entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditFilter {
    All,
    BySession(String),
    ByCompany(String),
    HighRisk,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        match self {
            AuditFilter::All => true,
            AuditFilter::BySession(session_id) => entry.session_id == *session_id,
            AuditFilter::ByCompany(company_id) => entry.company_id == *company_id,
            AuditFilter::HighRisk => entry.risk_level.is_high_risk(),
        }
    }

    pub fn apply(&self, entries: Vec<AuditLogEntry>) -> Vec<AuditLogEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Aggregate view of admin activity over a date range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub sessions: usize,
    pub actions: usize,
    pub companies: usize,
    pub high_risk: usize,
    /// Mean of (last entry - first entry) per session, in seconds
    pub avg_session_secs: f64,
}

/// Mean of (last - first) over per-session spans, in seconds
pub fn average_session_secs(spans: &[(DateTime<Utc>, DateTime<Utc>)]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }
    let total_ms: i64 = spans
        .iter()
        .map(|(first, last)| (*last - *first).num_milliseconds())
        .sum();
    total_ms as f64 / 1000.0 / spans.len() as f64
}

/// Most recent entries in `range`, newest first, capped at [`RECENT_LIMIT`]
pub async fn fetch_recent(store: &dyn AuditStore, range: &DateRange) -> Result<Vec<AuditLogEntry>> {
    store.recent(range, RECENT_LIMIT).await
}

pub async fn fetch_summary(
    store: &dyn AuditStore,
    range: &DateRange,
    admin_user_id: Option<&str>,
) -> Result<AuditSummary> {
    store.summary(range, admin_user_id).await
}
