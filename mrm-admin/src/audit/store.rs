//! Audit persistence
//!
//! [`AuditStore`] is the seam between the logger/query layer and storage.
//! [`SqliteAuditStore`] writes to the `audit_log` table created by
//! `mrm_common::db::init_database`; the table's own triggers keep it
//! append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use mrm_common::time::{from_db_timestamp, to_db_timestamp};
use mrm_common::{Error, Result};

use super::entry::{AuditLogEntry, NewAuditEntry};
use super::query::{average_session_secs, AuditSummary};

/// Optional inclusive bounds on `created_at`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
        }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| *ts >= start)
            && self.end_date.map_or(true, |end| *ts <= end)
    }
}

/// Storage backend for audit entries
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry, stamping its creation time
    async fn insert(&self, entry: NewAuditEntry) -> Result<()>;

    /// Newest-first entries inside `range`, at most `limit`
    async fn recent(&self, range: &DateRange, limit: i64) -> Result<Vec<AuditLogEntry>>;

    /// Aggregate counts inside `range`, optionally for one admin
    async fn summary(&self, range: &DateRange, admin_user_id: Option<&str>) -> Result<AuditSummary>;
}

/// SQLite-backed audit store
#[derive(Clone)]
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, admin_user_id, admin_email, session_id, action_type,
           company_id, company_name, resource_type, resource_id, action_details,
           ip_address, user_agent, request_path, risk_level, created_at
    FROM audit_log
"#;

/// Shared predicate for summary queries: ?1 start, ?2 end, ?3 admin
const SUMMARY_WHERE: &str = "(?1 IS NULL OR created_at >= ?1) AND (?2 IS NULL OR created_at <= ?2) \
     AND (?3 IS NULL OR admin_user_id = ?3)";

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn insert(&self, entry: NewAuditEntry) -> Result<()> {
        let details = serde_json::to_string(&entry.action_details)
            .map_err(|e| Error::Internal(format!("Failed to serialize action details: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                admin_user_id, admin_email, session_id, action_type,
                company_id, company_name, resource_type, resource_id,
                action_details, ip_address, user_agent, request_path, risk_level
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.admin_user_id)
        .bind(&entry.admin_email)
        .bind(&entry.session_id)
        .bind(&entry.action_type)
        .bind(&entry.company_id)
        .bind(&entry.company_name)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(details)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.request_path)
        .bind(entry.risk_level.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, range: &DateRange, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR created_at >= ?1) AND (?2 IS NULL OR created_at <= ?2) \
             ORDER BY created_at DESC, id DESC LIMIT ?3",
            SELECT_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(range.start_date.as_ref().map(to_db_timestamp))
            .bind(range.end_date.as_ref().map(to_db_timestamp))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn summary(&self, range: &DateRange, admin_user_id: Option<&str>) -> Result<AuditSummary> {
        let start = range.start_date.as_ref().map(to_db_timestamp);
        let end = range.end_date.as_ref().map(to_db_timestamp);
        let (start, end) = (start.as_deref(), end.as_deref());

        let counts_sql = format!(
            "SELECT COUNT(*) AS actions, \
                    COUNT(DISTINCT session_id) AS sessions, \
                    COUNT(DISTINCT company_id) AS companies, \
                    COALESCE(SUM(CASE WHEN risk_level IN ('high', 'critical') THEN 1 ELSE 0 END), 0) AS high_risk \
             FROM audit_log WHERE {}",
            SUMMARY_WHERE
        );
        let counts = sqlx::query(&counts_sql)
            .bind(start)
            .bind(end)
            .bind(admin_user_id)
            .fetch_one(&self.pool)
            .await?;

        // Fixed-width timestamps order correctly as strings
        let spans_sql = format!(
            "SELECT MIN(created_at) AS first_at, MAX(created_at) AS last_at \
             FROM audit_log WHERE {} GROUP BY session_id",
            SUMMARY_WHERE
        );
        let span_rows = sqlx::query(&spans_sql)
            .bind(start)
            .bind(end)
            .bind(admin_user_id)
            .fetch_all(&self.pool)
            .await?;

        let spans = span_rows
            .iter()
            .map(|row| -> Result<(DateTime<Utc>, DateTime<Utc>)> {
                let first: String = row.try_get("first_at")?;
                let last: String = row.try_get("last_at")?;
                Ok((from_db_timestamp(&first)?, from_db_timestamp(&last)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AuditSummary {
            sessions: count(&counts, "sessions")?,
            actions: count(&counts, "actions")?,
            companies: count(&counts, "companies")?,
            high_risk: count(&counts, "high_risk")?,
            avg_session_secs: average_session_secs(&spans),
        })
    }
}

fn count(row: &SqliteRow, column: &str) -> Result<usize> {
    let value: i64 = row.try_get(column)?;
    Ok(value.max(0) as usize)
}

fn entry_from_row(row: &SqliteRow) -> Result<AuditLogEntry> {
    let details: String = row.try_get("action_details")?;
    let action_details: Map<String, Value> = serde_json::from_str(&details)
        .map_err(|e| Error::Internal(format!("Failed to deserialize action details: {}", e)))?;

    let risk_level: String = row.try_get("risk_level")?;
    let risk_level = risk_level.parse().map_err(Error::Internal)?;

    let created_at: String = row.try_get("created_at")?;

    Ok(AuditLogEntry {
        id: row.try_get("id")?,
        admin_user_id: row.try_get("admin_user_id")?,
        admin_email: row.try_get("admin_email")?,
        session_id: row.try_get("session_id")?,
        action_type: row.try_get("action_type")?,
        company_id: row.try_get("company_id")?,
        company_name: row.try_get("company_name")?,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        action_details,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        request_path: row.try_get("request_path")?,
        risk_level,
        created_at: from_db_timestamp(&created_at)?,
    })
}
