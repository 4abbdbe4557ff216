//! # Runtime Configuration Module
//!
//! Environment variables that tune the coroutine runtime and request handling.
//!
//! ## Environment Variables
//!
//! ### `BRRTMOCK_STACK_SIZE`
//!
//! Stack size for request coroutines. Decimal (`16384`) or hexadecimal
//! (`0x4000`). Default: `0x4000` (16 KB).
//!
//! Handlers that build deep schema fabrications or call upstreams through
//! `proxy()` may want `0x8000` or more.
//!
//! ### `BRRTMOCK_REQUEST_TIMEOUT_MS`
//!
//! Deadline for each inbound request, in milliseconds. Proxied calls made by a
//! handler share this deadline. Default: `30000`.
//!
//! ## Usage
//!
//! ```rust
//! use brrtmock::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;
use std::time::Duration;

const DEFAULT_STACK_SIZE: usize = 0x4000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    pub request_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("BRRTMOCK_STACK_SIZE").ok().as_deref(),
            env::var("BRRTMOCK_REQUEST_TIMEOUT_MS").ok().as_deref(),
        )
    }

    fn from_vars(stack_size: Option<&str>, timeout_ms: Option<&str>) -> Self {
        let stack_size = stack_size
            .and_then(parse_size)
            .unwrap_or(DEFAULT_STACK_SIZE);
        let timeout_ms = timeout_ms
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        RuntimeConfig {
            stack_size,
            request_timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Apply the stack size to the `may` scheduler. Call before starting the server.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}
