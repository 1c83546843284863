//! Audit trail for admin actions taken in view mode
//!
//! - [`risk`]: action kinds and risk levels
//! - [`entry`]: record types
//! - [`store`]: persistence seam and SQLite implementation
//! - [`ip_lookup`]: session-cached caller IP resolution
//! - [`logger`]: fire-and-forget logging and `wrap_action`
//! - [`query`]: recent entries, filters and summaries

pub mod entry;
pub mod ip_lookup;
pub mod logger;
pub mod query;
pub mod risk;
pub mod store;

pub use entry::{AuditLogEntry, LogParams, NewAuditEntry};
pub use ip_lookup::{HttpIpLookup, IpLookup, DEFAULT_IP_LOOKUP_URL};
pub use logger::{ActionLogger, RequestMeta};
pub use query::{AuditFilter, AuditSummary, RECENT_LIMIT};
pub use risk::{ActionKind, RiskLevel};
pub use store::{AuditStore, DateRange, SqliteAuditStore};
