//! HTTP API handlers for mrm-admin

pub mod audit;
pub mod branding;
pub mod extract;
pub mod health;
pub mod identity;
pub mod sessions;
pub mod view_mode;

pub use audit::{audit_logs, audit_summary};
pub use branding::{get_branding, update_branding};
pub use extract::{session_middleware, SessionScope, SESSION_HEADER};
pub use health::health_routes;
pub use identity::get_identity;
pub use sessions::{close_session, open_session};
pub use view_mode::{current_view_mode, enter_view_mode, exit_view_mode};
