//! Admin sessions and view mode
//!
//! A [`SessionContext`] is created per signed-in user and passed explicitly
//! to everything that needs to know who is acting and on whose behalf.

pub mod context;
pub mod identity;
pub mod registry;

pub use context::{AdminIdentity, Principal, Role, SessionContext, ViewContext, ViewMode};
pub use identity::{effective_identity, EffectiveIdentity};
pub use registry::{SessionRegistry, DEFAULT_IDLE_TIMEOUT_SECS};
