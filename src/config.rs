//! # Configuration Module
//!
//! Optional YAML configuration for `brrtmock serve`.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration:
//!
//! ```yaml
//! server:
//!   addr: 0.0.0.0:3100
//! cors:
//!   enabled: true
//!   allow_origin: "*"
//!   allow_headers: [Content-Type, Authorization, Accept, X-Request-Id]
//! proxy:
//!   url: http://localhost:8080
//!   paths: [/legacy, /auth]
//!   timeout_ms: 30000
//! ```
//!
//! Requests whose path starts with one of `proxy.paths` are forwarded to
//! `proxy.url` without touching the route tree.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3100".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_origin: String,
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_origin: "*".to_string(),
            allow_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "Accept".to_string(),
                "X-Request-Id".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Upstream base URL; proxying is off when unset
    pub url: Option<String>,
    /// Path prefixes forwarded wholesale to `url`
    pub paths: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: None,
            paths: Vec::new(),
            timeout_ms: 30_000,
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The upstream URL when `path` falls under one of the proxied prefixes.
    ///
    /// Prefixes match on segment boundaries: `/auth` covers `/auth` and
    /// `/auth/login` but not `/authors`.
    pub fn target_for(&self, path: &str) -> Option<&str> {
        let url = self.url.as_deref()?;
        self.paths
            .iter()
            .map(|p| p.trim_end_matches('/'))
            .any(|prefix| {
                prefix.is_empty()
                    || path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .then_some(url)
    }
}

impl AppConfig {
    /// Load a configuration file. YAML is a superset of JSON, so both work.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
