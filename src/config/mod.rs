mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./voxlink.toml",
        "./config.toml",
        "~/.config/voxlink/config.toml",
        "/etc/voxlink/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if reqwest::Url::parse(&config.server.public_base_url).is_err() {
        anyhow::bail!(
            "public_base_url is not an absolute URL: {}",
            config.server.public_base_url
        );
    }

    if config.auth.session_timeout_mins == 0 {
        anyhow::bail!("Session timeout cannot be 0");
    }
    if config.auth.session_timeout_mins > MAX_SESSION_TIMEOUT_MINS {
        anyhow::bail!(
            "session_timeout_mins ({}) exceeds the maximum of {}",
            config.auth.session_timeout_mins,
            MAX_SESSION_TIMEOUT_MINS
        );
    }

    if !config.auth.is_configured() {
        tracing::warn!("No shared secret configured; internal browse mode stays locked");
    }

    if config.catalog.source.is_none() {
        tracing::warn!("No catalog source configured; the catalog will be empty");
    }

    let cache = &config.cache;
    if cache.fetch_timeout_secs == 0 {
        anyhow::bail!("Fetch timeout cannot be 0");
    }
    if cache.negative_ttl_secs >= cache.positive_ttl_secs {
        anyhow::bail!(
            "negative_ttl_secs ({}) must be shorter than positive_ttl_secs ({})",
            cache.negative_ttl_secs,
            cache.positive_ttl_secs
        );
    }

    Ok(())
}
