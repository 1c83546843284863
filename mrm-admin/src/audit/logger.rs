//! Action logger
//!
//! Records admin actions taken in view mode. Logging is observational only:
//! it never blocks, fails or alters the action being audited.
//!
//! `log_action` does the cheap, session-local checks on the caller's task
//! (view mode, admin identity, risk) and queues the entry. A background
//! worker hands each entry to its own task, which resolves the caller IP and
//! persists, so a slow lookup for one session never holds up another.
//! Failures are traced and dropped.

use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::session::{AdminIdentity, SessionContext, ViewContext};

use super::entry::{LogParams, NewAuditEntry};
use super::ip_lookup::{resolve_session_ip, IpLookup};
use super::risk::{classify, escalate_for_failure, RiskLevel};
use super::store::AuditStore;

/// Request details captured alongside each entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub user_agent: String,
    pub request_path: String,
}

impl RequestMeta {
    pub fn new(user_agent: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            request_path: request_path.into(),
        }
    }
}

/// Entry waiting for IP resolution and persistence
struct PendingEntry {
    session: Arc<SessionContext>,
    admin: AdminIdentity,
    view: ViewContext,
    params: LogParams,
    risk_level: RiskLevel,
    meta: RequestMeta,
}

enum AuditJob {
    Record(Box<PendingEntry>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the audit worker; cheap to clone
#[derive(Clone)]
pub struct ActionLogger {
    tx: mpsc::UnboundedSender<AuditJob>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ActionLogger {
    /// Start the background worker on the current Tokio runtime
    pub fn spawn(store: Arc<dyn AuditStore>, ip_lookup: Arc<dyn IpLookup>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, store, ip_lookup));
        Self {
            tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Queue an audit entry for `params`; returns immediately
    ///
    /// No-op outside view mode, and for sessions without an admin identity.
    pub fn log_action(&self, session: &Arc<SessionContext>, meta: &RequestMeta, params: LogParams) {
        let risk_level = classify(&params.action_type, params.risk_level);
        self.submit(session, meta, params, risk_level);
    }

    /// Run `action` and audit its outcome
    ///
    /// Exactly one entry is queued per call when auditing applies. On error
    /// the entry carries `success: false` and the error text, with risk
    /// raised to at least medium, and the original error is returned as-is.
    pub async fn wrap_action<T, E, F, Fut>(
        &self,
        session: &Arc<SessionContext>,
        meta: &RequestMeta,
        params: LogParams,
        action: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        match action().await {
            Ok(value) => {
                let params = params.with_detail("success", true);
                self.log_action(session, meta, params);
                Ok(value)
            }
            Err(error) => {
                let risk_level = escalate_for_failure(classify(&params.action_type, params.risk_level));
                let params = params
                    .with_detail("success", false)
                    .with_detail("error", Value::String(error.to_string()));
                self.submit(session, meta, params, risk_level);
                Err(error)
            }
        }
    }

    /// Wait until every entry queued before this call has been handled
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(AuditJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Drain the queue and stop the worker
    ///
    /// Other clones of this handle keep the channel open; shutdown waits for
    /// the queue to drain and then detaches from the worker.
    pub async fn shutdown(&self) {
        self.flush().await;
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            worker.abort();
            let _ = worker.await;
            info!("Audit worker stopped");
        }
    }

    fn submit(
        &self,
        session: &Arc<SessionContext>,
        meta: &RequestMeta,
        params: LogParams,
        risk_level: RiskLevel,
    ) {
        let Some(view) = session.view_context() else {
            debug!(action_type = %params.action_type, "Not in view mode, skipping audit");
            return;
        };

        let Some(admin) = session.admin_identity() else {
            debug!(
                session_id = %session.session_id(),
                action_type = %params.action_type,
                "No admin identity for session, skipping audit"
            );
            return;
        };

        let job = AuditJob::Record(Box::new(PendingEntry {
            session: session.clone(),
            admin,
            view,
            params,
            risk_level,
            meta: meta.clone(),
        }));

        if self.tx.send(job).is_err() {
            warn!("Audit worker is not running, entry dropped");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<AuditJob>,
    store: Arc<dyn AuditStore>,
    ip_lookup: Arc<dyn IpLookup>,
) {
    debug!("Audit worker started");
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            job = rx.recv() => match job {
                Some(AuditJob::Record(pending)) => {
                    let store = store.clone();
                    let ip_lookup = ip_lookup.clone();
                    in_flight.spawn(async move {
                        persist(*pending, store.as_ref(), ip_lookup.as_ref()).await
                    });
                }
                Some(AuditJob::Flush(done)) => {
                    drain(&mut in_flight).await;
                    let _ = done.send(());
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                report_join(joined);
            }
        }
    }

    drain(&mut in_flight).await;
    debug!("Audit worker stopped: all logger handles dropped");
}

/// Wait for every in-flight entry to finish
async fn drain(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.join_next().await {
        report_join(joined);
    }
}

fn report_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if !e.is_cancelled() {
            warn!(error = %e, "Audit persist task failed");
        }
    }
}

async fn persist(pending: PendingEntry, store: &dyn AuditStore, ip_lookup: &dyn IpLookup) {
    let ip_address = resolve_session_ip(&pending.session, ip_lookup).await;

    let PendingEntry {
        admin,
        view,
        params,
        risk_level,
        meta,
        ..
    } = pending;

    let entry = NewAuditEntry {
        admin_user_id: admin.user_id,
        admin_email: admin.email,
        session_id: view.session_id,
        action_type: params.action_type,
        company_id: view.company_id,
        company_name: view.company_name,
        resource_type: params.resource_type,
        resource_id: params.resource_id,
        action_details: params.action_details,
        ip_address,
        user_agent: meta.user_agent,
        request_path: meta.request_path,
        risk_level,
    };

    let action_type = entry.action_type.clone();
    if let Err(e) = store.insert(entry).await {
        warn!(action_type = %action_type, error = %e, "Failed to persist audit entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::AuditLogEntry;
    use crate::audit::query::AuditSummary;
    use crate::audit::store::DateRange;
    use crate::session::Principal;
    use async_trait::async_trait;
    use mrm_common::db::Company;
    use mrm_common::{Error, Result};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingStore {
        entries: Mutex<Vec<NewAuditEntry>>,
        fail: AtomicBool,
    }

    impl RecordingStore {
        fn entries(&self) -> Vec<NewAuditEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuditStore for RecordingStore {
        async fn insert(&self, entry: NewAuditEntry) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Internal("store offline".to_string()));
            }
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        async fn recent(&self, _range: &DateRange, _limit: i64) -> Result<Vec<AuditLogEntry>> {
            Ok(Vec::new())
        }

        async fn summary(
            &self,
            _range: &DateRange,
            _admin_user_id: Option<&str>,
        ) -> Result<AuditSummary> {
            Ok(AuditSummary::default())
        }
    }

    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IpLookup for CountingLookup {
        async fn lookup(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some("203.0.113.50".to_string())
        }
    }

    #[derive(Debug, PartialEq)]
    struct NotFound(&'static str);

    impl Display for NotFound {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    struct Harness {
        logger: ActionLogger,
        store: Arc<RecordingStore>,
        lookup: Arc<CountingLookup>,
    }

    fn harness() -> Harness {
        let store = Arc::new(RecordingStore::default());
        let lookup = Arc::new(CountingLookup::default());
        let logger = ActionLogger::spawn(store.clone(), lookup.clone());
        Harness { logger, store, lookup }
    }

    fn admin_session(session_id: &str) -> Arc<SessionContext> {
        Arc::new(SessionContext::new(
            session_id,
            Principal::admin("admin-1", "ops@label.test"),
        ))
    }

    fn view_company(session: &SessionContext, company_id: &str) {
        session.enter_view_mode(&Company {
            id: company_id.to_string(),
            name: "Acme Music".to_string(),
            representative_user_id: "u-acme".to_string(),
        });
    }

    fn meta() -> RequestMeta {
        RequestMeta::new("test-agent", "/api/royalties/r9")
    }

    #[tokio::test]
    async fn test_no_entry_outside_view_mode() {
        let h = harness();
        let session = admin_session("s1");

        for action in ["update_contract", "delete_royalty", "read_statement"] {
            h.logger.log_action(&session, &meta(), LogParams::new(action, "contract"));
        }
        h.logger.flush().await;

        assert!(h.store.entries().is_empty());
        assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrapped_save_runs_without_audit_when_not_viewing() {
        let h = harness();
        let session = admin_session("s1");
        let saved = Arc::new(AtomicBool::new(false));

        let flag = saved.clone();
        let result: std::result::Result<&str, NotFound> = h
            .logger
            .wrap_action(
                &session,
                &meta(),
                LogParams::new("update_contract", "contract"),
                || async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok("saved")
                },
            )
            .await;
        h.logger.flush().await;

        assert_eq!(result, Ok("saved"));
        assert!(saved.load(Ordering::SeqCst));
        assert!(h.store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_no_entry_without_admin_identity() {
        let h = harness();
        let session = Arc::new(SessionContext::new(
            "s1",
            Principal::client("u7", "artist@band.test", "c1"),
        ));
        view_company(&session, "c1");

        h.logger
            .log_action(&session, &meta(), LogParams::new("delete_royalty", "royalty"));
        h.logger.flush().await;

        assert!(h.store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_is_audited_and_error_returned_unchanged() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        let result: std::result::Result<(), NotFound> = h
            .logger
            .wrap_action(
                &session,
                &meta(),
                LogParams::new("delete_royalty", "royalty").with_resource_id("r9"),
                || async { Err(NotFound("not found")) },
            )
            .await;
        h.logger.flush().await;

        assert_eq!(result, Err(NotFound("not found")));

        let entries = h.store.entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.risk_level, RiskLevel::High);
        assert_eq!(entry.action_details["success"], json!(false));
        assert_eq!(entry.action_details["error"], json!("not found"));
        assert_eq!(entry.company_id, "c1");
        assert_eq!(entry.session_id, "s1");
        assert_eq!(entry.resource_type, "royalty");
        assert_eq!(entry.resource_id.as_deref(), Some("r9"));
        assert_eq!(entry.admin_user_id, "admin-1");
        assert_eq!(entry.admin_email, "ops@label.test");
        assert_eq!(entry.user_agent, "test-agent");
        assert_eq!(entry.request_path, "/api/royalties/r9");
        assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.50"));
    }

    #[tokio::test]
    async fn test_wrap_action_returns_the_same_error_value() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        #[derive(Debug)]
        struct Shared(Arc<String>);
        impl Display for Shared {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        let original = Arc::new("conflict".to_string());
        let thrown = original.clone();
        let result: std::result::Result<(), Shared> = h
            .logger
            .wrap_action(&session, &meta(), LogParams::new("update_contract", "contract"), || {
                async move { Err(Shared(thrown)) }
            })
            .await;

        let Shared(returned) = result.unwrap_err();
        assert!(Arc::ptr_eq(&returned, &original));
    }

    #[tokio::test]
    async fn test_one_entry_per_wrap_success_or_failure() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        let ok: std::result::Result<u32, NotFound> = h
            .logger
            .wrap_action(&session, &meta(), LogParams::new("create_work", "work"), || async {
                Ok(1)
            })
            .await;
        h.logger.flush().await;
        let err: std::result::Result<u32, NotFound> = h
            .logger
            .wrap_action(&session, &meta(), LogParams::new("create_work", "work"), || async {
                Err(NotFound("duplicate"))
            })
            .await;
        h.logger.flush().await;

        assert!(ok.is_ok());
        assert!(err.is_err());
        let entries = h.store.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action_details["success"], json!(true));
        assert_eq!(entries[1].action_details["success"], json!(false));
    }

    #[tokio::test]
    async fn test_failure_raises_low_risk_to_medium() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        let _: std::result::Result<(), NotFound> = h
            .logger
            .wrap_action(&session, &meta(), LogParams::new("read_statement", "statement"), || async {
                Err(NotFound("gone"))
            })
            .await;
        let _: std::result::Result<(), NotFound> = h
            .logger
            .wrap_action(
                &session,
                &meta(),
                LogParams::new("read_statement", "statement").with_risk_level(RiskLevel::Low),
                || async { Err(NotFound("gone")) },
            )
            .await;
        h.logger.flush().await;

        let levels: Vec<_> = h.store.entries().iter().map(|e| e.risk_level).collect();
        assert_eq!(levels, vec![RiskLevel::Medium, RiskLevel::Medium]);
    }

    #[tokio::test]
    async fn test_success_keeps_derived_or_override_risk() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        h.logger.log_action(&session, &meta(), LogParams::new("read_x", "x"));
        h.logger.log_action(&session, &meta(), LogParams::new("update_x", "x"));
        h.logger.log_action(
            &session,
            &meta(),
            LogParams::new("read_x", "x").with_risk_level(RiskLevel::Critical),
        );
        h.logger.flush().await;

        let mut levels: Vec<_> = h.store.entries().iter().map(|e| e.risk_level).collect();
        levels.sort();
        assert_eq!(levels, vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::Critical]);
    }

    #[tokio::test]
    async fn test_ip_lookup_happens_once_per_session() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        // First entry warms the session cache
        h.logger.log_action(&session, &meta(), LogParams::new("update_a", "a"));
        h.logger.flush().await;
        h.logger.log_action(&session, &meta(), LogParams::new("update_b", "b"));
        h.logger.log_action(&session, &meta(), LogParams::new("update_c", "c"));
        h.logger.flush().await;

        assert_eq!(h.store.entries().len(), 3);
        assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);

        let other = admin_session("s2");
        view_company(&other, "c1");
        h.logger.log_action(&other, &meta(), LogParams::new("update_d", "d"));
        h.logger.flush().await;

        assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 2, "Cache is per session");
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let h = harness();
        h.store.fail.store(true, Ordering::SeqCst);
        let session = admin_session("s1");
        view_company(&session, "c1");

        let result: std::result::Result<&str, NotFound> = h
            .logger
            .wrap_action(&session, &meta(), LogParams::new("update_contract", "contract"), || async {
                Ok("saved")
            })
            .await;
        h.logger.flush().await;

        assert_eq!(result, Ok("saved"));

        // Worker keeps running after a failed insert
        h.store.fail.store(false, Ordering::SeqCst);
        h.logger.log_action(&session, &meta(), LogParams::new("update_contract", "contract"));
        h.logger.flush().await;
        assert_eq!(h.store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_entry_uses_context_at_submit_time() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        h.logger.log_action(&session, &meta(), LogParams::new("update_x", "x"));
        session.exit_view_mode();
        h.logger.flush().await;

        let entries = h.store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company_id, "c1");
    }

    #[tokio::test]
    async fn test_log_after_shutdown_is_dropped_quietly() {
        let h = harness();
        let session = admin_session("s1");
        view_company(&session, "c1");

        h.logger.shutdown().await;
        h.logger.log_action(&session, &meta(), LogParams::new("update_x", "x"));
        h.logger.flush().await;

        assert!(h.store.entries().is_empty());
    }

    /// Lookup that stalls, standing in for an unreachable IP service
    struct StalledLookup {
        delay: std::time::Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IpLookup for StalledLookup {
        async fn lookup(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            None
        }
    }

    async fn wait_for_entries(store: &RecordingStore, count: usize, within: std::time::Duration) -> bool {
        tokio::time::timeout(within, async {
            while store.entries().len() < count {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn test_stalled_lookup_does_not_delay_warm_session() {
        let store = Arc::new(RecordingStore::default());
        let lookup = Arc::new(StalledLookup {
            delay: std::time::Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        });
        let logger = ActionLogger::spawn(store.clone(), lookup.clone());

        let cold = admin_session("cold");
        view_company(&cold, "c1");
        let warm = admin_session("warm");
        view_company(&warm, "c2");
        warm.cache_ip("203.0.113.9".to_string());

        logger.log_action(&cold, &meta(), LogParams::new("update_x", "x"));
        logger.log_action(&warm, &meta(), LogParams::new("update_y", "y"));

        assert!(
            wait_for_entries(&store, 1, std::time::Duration::from_secs(2)).await,
            "Warm session entry was held behind the stalled lookup"
        );
        let entries = store.entries();
        assert_eq!(entries[0].session_id, "warm");
        assert_eq!(entries[0].ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_lookups_persist_concurrently() {
        let store = Arc::new(RecordingStore::default());
        let lookup = Arc::new(StalledLookup {
            delay: std::time::Duration::from_millis(250),
            calls: AtomicUsize::new(0),
        });
        let logger = ActionLogger::spawn(store.clone(), lookup.clone());

        let started = std::time::Instant::now();
        for i in 0..20 {
            let session = admin_session(&format!("s{}", i));
            view_company(&session, "c1");
            logger.log_action(&session, &meta(), LogParams::new("update_x", "x"));
        }
        logger.flush().await;

        assert_eq!(store.entries().len(), 20);
        assert!(store.entries().iter().all(|e| e.ip_address.is_none()));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 20);
        assert!(
            started.elapsed() < std::time::Duration::from_secs(2),
            "took {:?}",
            started.elapsed()
        );
    }
}
