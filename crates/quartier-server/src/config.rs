//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use quartier_shared::constants::{DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_HTTP_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Explicit database file path.
    /// Env: `DB_PATH`
    /// Default: platform data directory (`~/.local/share/quartier/...`).
    pub db_path: Option<PathBuf>,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Quartier Node"`
    pub instance_name: String,

    /// Bearer token required by `POST /internal/cleanup`.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (the cleanup endpoint reports a structured failure).
    pub admin_token: Option<String>,

    /// Seconds between scheduled story-cleanup sweeps.
    /// Env: `CLEANUP_INTERVAL_SECS`
    /// Default: `3600`
    pub cleanup_interval_secs: u64,

    /// Per-IP request budget per minute for the HTTP API.
    /// Env: `REQUESTS_PER_MINUTE`
    /// Default: `300`
    pub requests_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            db_path: None,
            instance_name: "Quartier Node".to_string(),
            admin_token: None,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            requests_per_minute: 300,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(token) = std::env::var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Ok(val) = std::env::var("CLEANUP_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.cleanup_interval_secs = n,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid CLEANUP_INTERVAL_SECS, using default"
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("REQUESTS_PER_MINUTE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.requests_per_minute = n,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid REQUESTS_PER_MINUTE, using default"
                    );
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.cleanup_interval_secs, 3600);
        assert!(config.admin_token.is_none());
        assert!(config.db_path.is_none());
    }
}
