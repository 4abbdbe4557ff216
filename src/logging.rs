//! Structured logging setup.
//!
//! `tracing` events carry key/value fields everywhere in the crate; this module
//! installs the subscriber that renders them. Configuration comes from the
//! environment:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `BRRTMOCK_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `BRRTMOCK_LOG_FORMAT` | `pretty` | `json` or `pretty` |
//! | `BRRTMOCK_LOG_TARGET_FILTER` | unset | extra comma-separated directives, e.g. `brrtmock::router=debug` |
//! | `BRRTMOCK_LOG_ASYNC` | `false` | write through a non-blocking `tracing-appender` worker |
//! | `BRRTMOCK_LOG_INCLUDE_LOCATION` | `false` | add file:line to every event |
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for machines, pretty-print for people at a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    /// Comma-separated `EnvFilter` directives added on top of the level
    pub target_filter: Option<String>,
    pub async_logging: bool,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            async_logging: false,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("BRRTMOCK_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("BRRTMOCK_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.format),
            target_filter: env::var("BRRTMOCK_LOG_TARGET_FILTER").ok(),
            async_logging: env_flag("BRRTMOCK_LOG_ASYNC").unwrap_or(defaults.async_logging),
            include_location: env_flag("BRRTMOCK_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Build the filter: `RUST_LOG` or the configured level, transport noise
    /// capped at warn, then the extra target directives.
    pub fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        if let Ok(directive) = "may_minihttp=warn".parse() {
            filter = filter.add_directive(directive);
        }

        for directive in self
            .target_filter
            .iter()
            .flat_map(|f| f.split(','))
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
        filter
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

/// Initialize logging from the environment.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LogConfig::from_env())
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
        };
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize async logging")?;
        // The worker flushes on drop; keep it for the life of the process.
        std::mem::forget(guard);
    } else {
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
        };
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}
