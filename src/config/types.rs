use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL that share links are built on
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_public_base_url() -> String {
    "http://localhost:8080/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared secret for the internal browse mode, in plain text
    #[serde(default)]
    pub secret: Option<String>,

    /// Bcrypt hash of the shared secret (generate with `voxlink hash-password`)
    #[serde(default)]
    pub secret_hash: Option<String>,

    /// Minutes a session stays valid after login (default: 30)
    #[serde(default = "default_session_timeout")]
    pub session_timeout_mins: u64,
}

fn default_session_timeout() -> u64 {
    30
}

/// Longest accepted session window (one week).
pub const MAX_SESSION_TIMEOUT_MINS: u64 = 7 * 24 * 60;

impl AuthConfig {
    /// Whether any secret is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.is_empty())
            || self.secret_hash.as_deref().is_some_and(|s| !s.is_empty())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            secret_hash: None,
            session_timeout_mins: default_session_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// URL of a CSV export, or a local CSV path
    #[serde(default)]
    pub source: Option<String>,

    /// Seconds between catalog reloads; 0 loads once at start-up
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: u64,
}

fn default_reload_interval() -> u64 {
    600
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: None,
            reload_interval_secs: default_reload_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Lifetime of a fetched payload
    #[serde(default = "default_positive_ttl")]
    pub positive_ttl_secs: u64,

    /// Lifetime of a cached fetch failure; must be shorter than the positive TTL
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Cap on cached payload bytes; 0 disables the cap
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Seconds between expiry sweeps; 0 relies on lazy expiry only
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_positive_ttl() -> u64 {
    3600
}
fn default_negative_ttl() -> u64 {
    30
}
fn default_fetch_timeout() -> u64 {
    15
}
fn default_max_bytes() -> usize {
    256 * 1024 * 1024
}
fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            positive_ttl_secs: default_positive_ttl(),
            negative_ttl_secs: default_negative_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_bytes: default_max_bytes(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}
