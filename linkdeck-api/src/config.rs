//! API Configuration Module
//!
//! Server-level settings: where to listen, how deep the per-channel
//! notification buffers are, CORS and log format. Loaded from environment
//! variables with defaults suitable for development. Cache TTLs and
//! enrichment limits live in [`linkdeck_core::SyncConfig`].

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    /// Port to bind.
    pub port: u16,

    /// Buffered messages per notification channel before slow WebSocket
    /// subscribers start lagging.
    pub broadcast_capacity: usize,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            broadcast_capacity: 1024,
            cors_origins: Vec::new(),
            json_logs: false,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LINKDECK_BIND_ADDR`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `LINKDECK_PORT`: Port (default: 3000)
    /// - `LINKDECK_BROADCAST_CAPACITY`: Per-channel buffer (default: 1024)
    /// - `LINKDECK_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `LINKDECK_JSON_LOGS`: "true" or "1" for JSON logs (default: false)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let bind_host = std::env::var("LINKDECK_BIND_ADDR").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("LINKDECK_PORT").ok())
        {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => defaults.port,
        };

        let broadcast_capacity = std::env::var("LINKDECK_BROADCAST_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(defaults.broadcast_capacity);

        let cors_origins = std::env::var("LINKDECK_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let json_logs = std::env::var("LINKDECK_JSON_LOGS")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false);

        Ok(Self {
            bind_host,
            port,
            broadcast_capacity,
            cors_origins,
            json_logs,
        })
    }

    /// The socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }
        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.linkdeck.dev
            match (allowed.strip_prefix("*."), origin.split_once("://")) {
                (Some(pattern), Some((_, host))) => {
                    host == pattern || host.ends_with(&format!(".{}", pattern))
                }
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
        assert_eq!(config.broadcast_capacity, 1024);
    }

    #[test]
    fn test_invalid_bind_host_rejected() {
        let config = ApiConfig {
            bind_host: "not an address".into(),
            ..Default::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_origin_matching() {
        let open = ApiConfig::default();
        assert!(open.is_origin_allowed("https://anything.example"));

        let strict = ApiConfig {
            cors_origins: vec!["https://app.linkdeck.dev".into(), "*.linkdeck.dev".into()],
            ..Default::default()
        };
        assert!(strict.is_origin_allowed("https://app.linkdeck.dev"));
        assert!(strict.is_origin_allowed("https://beta.linkdeck.dev"));
        assert!(!strict.is_origin_allowed("https://linkdeck.dev.evil.example"));
    }
}
