//! # CLI Module
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! brrtmock serve --spec openapi.yaml [--addr 127.0.0.1:3100] [--config brrtmock.yaml] [--watch]
//! ```
//!
//! Registers a random-response handler for every operation and serves it.
//! `--watch` reloads the document on change. SIGINT/SIGTERM stop the server.
//!
//! ### `routes`
//!
//! ```bash
//! brrtmock routes --spec openapi.yaml
//! ```
//!
//! Prints one `METHOD path` line per operation.

mod commands;


pub use commands::{route_lines, run, run_cli, start_server, Cli, Commands};
