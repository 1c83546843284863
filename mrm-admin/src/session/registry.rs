//! Session registry
//!
//! Owns every live [`SessionContext`]. Requests borrow a context by `Arc`;
//! the registry alone decides when a session ends. Sessions idle longer than
//! the configured timeout are dropped, which returns their view mode to Idle.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use mrm_common::{uuid_utils, Clock};

use super::context::{Principal, SessionContext};

/// Default idle timeout (8 hours)
pub const DEFAULT_IDLE_TIMEOUT_SECS: i64 = 8 * 60 * 60;

struct SessionEntry {
    context: Arc<SessionContext>,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            clock,
        }
    }

    /// Open a session for an authenticated principal
    pub async fn open(&self, principal: Principal) -> Arc<SessionContext> {
        let session_id = uuid_utils::generate().to_string();
        let context = Arc::new(SessionContext::new(session_id.clone(), principal));

        info!(
            session_id = %session_id,
            user_id = %context.principal().user_id,
            role = ?context.principal().role,
            "Session opened"
        );

        self.sessions.write().await.insert(
            session_id,
            SessionEntry {
                context: context.clone(),
                last_seen: self.clock.now(),
            },
        );
        context
    }

    /// Look up a live session, refreshing its idle timer
    ///
    /// An expired session is removed and reported as absent.
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionContext>> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(session_id) {
            Some(entry) => now - entry.last_seen > self.idle_timeout,
            None => return None,
        };

        if expired {
            if let Some(entry) = sessions.remove(session_id) {
                end_session(&entry.context, "expired");
            }
            return None;
        }

        let entry = sessions.get_mut(session_id)?;
        entry.last_seen = now;
        Some(entry.context.clone())
    }

    /// End a session explicitly; returns false if it was not live
    pub async fn close(&self, session_id: &str) -> bool {
        match self.sessions.write().await.remove(session_id) {
            Some(entry) => {
                end_session(&entry.context, "closed");
                true
            }
            None => false,
        }
    }

    /// Drop every session past its idle timeout
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| now - entry.last_seen > self.idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(entry) = sessions.remove(id) {
                end_session(&entry.context, "expired");
            }
        }

        if !expired.is_empty() {
            debug!("Swept {} expired sessions", expired.len());
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Periodically sweep expired sessions until the task is aborted
    pub fn spawn_sweeper(&self, every: std::time::Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                registry.sweep_expired().await;
            }
        })
    }
}

/// A session ending always leaves view mode
fn end_session(context: &SessionContext, reason: &str) {
    if let Some(view) = context.exit_view_mode() {
        info!(
            session_id = %context.session_id(),
            company_id = %view.company_id,
            "View mode ended with session"
        );
    }
    info!(session_id = %context.session_id(), reason, "Session ended");
}
