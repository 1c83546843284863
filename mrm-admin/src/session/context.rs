//! Per-session state: who is signed in, which company (if any) they are
//! viewing, and the cached caller IP.
//!
//! View mode is a two-state machine:
//!
//! ```text
//! Idle --enter_view_mode--> Viewing --exit_view_mode / session end--> Idle
//! ```
//!
//! Entering while already viewing replaces the context (last write wins).

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, RwLock};

use mrm_common::db::Company;

/// Role granted by the authentication provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

/// Signed-in user as reported by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    /// Company the user belongs to (client users)
    #[serde(default)]
    pub company_id: Option<String>,
}

impl Principal {
    pub fn admin(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role: Role::Admin,
            company_id: None,
        }
    }

    pub fn client(
        user_id: impl Into<String>,
        email: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role: Role::Client,
            company_id: Some(company_id.into()),
        }
    }
}

/// Identity recorded on audit entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub user_id: String,
    pub email: String,
}

/// Company an admin is currently viewing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewContext {
    pub company_id: String,
    pub company_name: String,
    pub session_id: String,
    pub is_view_mode: bool,
    /// User whose identity data paths act as while viewing
    pub representative_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Idle,
    Viewing(ViewContext),
}

/// Session-scoped state, shared by `Arc` between the registry and requests
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    principal: Principal,
    view_mode: RwLock<ViewMode>,
    ip_cache: Mutex<Option<String>>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            session_id: session_id.into(),
            principal,
            view_mode: RwLock::new(ViewMode::Idle),
            ip_cache: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn is_admin(&self) -> bool {
        self.principal.role == Role::Admin
    }

    /// Admin identity for audit entries; `None` for non-admin sessions
    pub fn admin_identity(&self) -> Option<AdminIdentity> {
        self.is_admin().then(|| AdminIdentity {
            user_id: self.principal.user_id.clone(),
            email: self.principal.email.clone(),
        })
    }

    /// Start viewing `company`, replacing any current view
    pub fn enter_view_mode(&self, company: &Company) -> ViewContext {
        let context = ViewContext {
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            session_id: self.session_id.clone(),
            is_view_mode: true,
            representative_user_id: company.representative_user_id.clone(),
        };
        *self.view_mode.write().unwrap_or_else(|e| e.into_inner()) =
            ViewMode::Viewing(context.clone());
        context
    }

    /// Return to Idle, handing back the context that was active
    pub fn exit_view_mode(&self) -> Option<ViewContext> {
        let previous = std::mem::replace(
            &mut *self.view_mode.write().unwrap_or_else(|e| e.into_inner()),
            ViewMode::Idle,
        );
        match previous {
            ViewMode::Viewing(context) => Some(context),
            ViewMode::Idle => None,
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn view_context(&self) -> Option<ViewContext> {
        match self.view_mode() {
            ViewMode::Viewing(context) => Some(context),
            ViewMode::Idle => None,
        }
    }

    pub fn is_view_mode(&self) -> bool {
        matches!(
            *self.view_mode.read().unwrap_or_else(|e| e.into_inner()),
            ViewMode::Viewing(_)
        )
    }

    pub fn cached_ip(&self) -> Option<String> {
        self.ip_cache.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn cache_ip(&self, ip: String) {
        *self.ip_cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(ip);
    }
}
