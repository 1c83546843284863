//! Bootstrap configuration for mrm-admin
//!
//! Settings come from, highest priority first: command-line arguments (each
//! with an environment variable fallback), the TOML file, then built-in
//! defaults. The root folder follows the shared resolver in mrm-common.

use clap::Parser;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use mrm_common::cache::DEFAULT_TTL_SECS;
use mrm_common::config::{read_toml_or_default, LoggingConfig, RootFolderResolver};

use crate::audit::DEFAULT_IP_LOOKUP_URL;
use crate::session::DEFAULT_IDLE_TIMEOUT_SECS;

/// Module name used for the config file and logs
pub const MODULE_NAME: &str = "mrm-admin";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Command-line arguments for mrm-admin
#[derive(Parser, Debug, Default)]
#[command(name = "mrm-admin")]
#[command(about = "Admin view-mode and audit service for MRM")]
#[command(version)]
pub struct Cli {
    /// Root folder holding the database
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config directory)
    #[arg(short, long, env = "MRM_ADMIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MRM_ADMIN_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "MRM_ADMIN_BIND_ADDRESS")]
    pub bind_address: Option<IpAddr>,
}

/// Contents of `mrm-admin.toml`; every field is optional
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_secs: i64,

    #[serde(default = "default_company_cache_ttl")]
    pub company_cache_ttl_secs: i64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_address: default_bind_address(),
            ip_lookup_url: default_ip_lookup_url(),
            session_idle_timeout_secs: default_session_idle_timeout(),
            company_cache_ttl_secs: default_company_cache_ttl(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_ip_lookup_url() -> String {
    DEFAULT_IP_LOOKUP_URL.to_string()
}

fn default_session_idle_timeout() -> i64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_company_cache_ttl() -> i64 {
    DEFAULT_TTL_SECS
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub root_folder: PathBuf,
    pub listen_addr: SocketAddr,
    pub ip_lookup_url: String,
    pub session_idle_timeout: chrono::Duration,
    pub company_cache_ttl: chrono::Duration,
    pub log_level: String,
}

impl AdminConfig {
    pub fn resolve(cli: Cli) -> Self {
        let resolver = RootFolderResolver::new(MODULE_NAME)
            .with_cli_arg(cli.root_folder)
            .with_config_path(cli.config);

        let toml: TomlConfig = read_toml_or_default(resolver.config_path());
        let root_folder = resolver.resolve();

        let port = cli.port.unwrap_or(toml.port);
        let bind_address = cli.bind_address.unwrap_or(toml.bind_address);

        Self {
            root_folder,
            listen_addr: SocketAddr::new(bind_address, port),
            ip_lookup_url: toml.ip_lookup_url,
            session_idle_timeout: chrono::Duration::seconds(positive_or(
                toml.session_idle_timeout_secs,
                DEFAULT_IDLE_TIMEOUT_SECS,
            )),
            company_cache_ttl: chrono::Duration::seconds(positive_or(
                toml.company_cache_ttl_secs,
                DEFAULT_TTL_SECS,
            )),
            log_level: toml.logging.level,
        }
    }
}

fn positive_or(value: i64, fallback: i64) -> i64 {
    if value > 0 {
        value
    } else {
        tracing::warn!("Ignoring non-positive duration {}s, using {}s", value, fallback);
        fallback
    }
}
