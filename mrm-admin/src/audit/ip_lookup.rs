//! Caller IP resolution for audit entries
//!
//! The address comes from a public "what is my IP" service answering
//! `{"ip": "..."}`. Lookups never fail loudly: any error yields `None`.
//! Results are cached on the session, so a warm session performs no further
//! lookups.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::session::SessionContext;

/// Default lookup endpoint
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

const USER_AGENT: &str = concat!("mrm-admin/", env!("CARGO_PKG_VERSION"));

/// Source of the caller's public IP address
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn lookup(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// HTTP lookup against an ipify-compatible endpoint
pub struct HttpIpLookup {
    http_client: reqwest::Client,
    url: String,
}

impl HttpIpLookup {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    async fn fetch(&self) -> Result<String, reqwest::Error> {
        let response: IpResponse = self
            .http_client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.ip)
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn lookup(&self) -> Option<String> {
        match self.fetch().await {
            Ok(ip) => {
                debug!(ip = %ip, "Resolved caller IP");
                Some(ip)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "IP lookup failed");
                None
            }
        }
    }
}

/// Session-cached IP resolution
///
/// Only successful lookups are cached; a failed lookup is retried on the next
/// audited action.
pub async fn resolve_session_ip(session: &SessionContext, lookup: &dyn IpLookup) -> Option<String> {
    if let Some(ip) = session.cached_ip() {
        return Some(ip);
    }

    let ip = lookup.lookup().await?;
    session.cache_ip(ip.clone());
    Some(ip)
}
