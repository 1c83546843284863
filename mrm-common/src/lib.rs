//! # MRM Common Library
//!
//! Shared code for the MRM admin services including:
//! - Database bootstrap and shared models (companies, branding, audit log schema)
//! - Configuration loading and root folder resolution
//! - Time sources with an injectable clock
//! - A TTL cache keyed on that clock
//! - Utility functions

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use cache::TtlCache;
pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
