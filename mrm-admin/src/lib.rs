//! mrm-admin library - admin view mode and audit trail
//!
//! Lets staff view the platform as a client company, attributes everything
//! they do there to their own identity, and serves the resulting audit
//! trail to dashboards.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod audit;
pub mod config;
pub mod directory;
pub mod error;
pub mod session;

use audit::{ActionLogger, AuditStore};
use directory::CompanyDirectory;
use session::SessionRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub logger: ActionLogger,
    pub directory: Arc<CompanyDirectory>,
    pub audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        sessions: SessionRegistry,
        logger: ActionLogger,
        directory: Arc<CompanyDirectory>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            sessions,
            logger,
            directory,
            audit_store,
        }
    }
}

/// Build application router
///
/// Everything under `/api` except session creation needs a live session.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    let protected = Router::new()
        .route("/api/sessions/current", delete(api::close_session))
        .route(
            "/api/view-mode",
            get(api::current_view_mode)
                .post(api::enter_view_mode)
                .delete(api::exit_view_mode),
        )
        .route("/api/identity", get(api::get_identity))
        .route("/api/branding", get(api::get_branding).put(api::update_branding))
        .route("/api/audit/logs", get(api::audit_logs))
        .route("/api/audit/summary", get(api::audit_summary))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    let public = Router::new()
        .route("/api/sessions", post(api::open_session))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
