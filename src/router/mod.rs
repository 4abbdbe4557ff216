//! # Router Module
//!
//! Path template registration and matching.
//!
//! ## Overview
//!
//! Handlers are registered per path template (`/pets/{id}`), one
//! [`HandlerBundle`](crate::handler::HandlerBundle) per template with one handler
//! per HTTP method. The [`Registry`] answers three questions for the dispatcher:
//!
//! - which bundle handles a concrete path, with what path parameters, and which
//!   template matched ([`Registry::handler`])
//! - whether a method is served at a path ([`Registry::exists`])
//! - an invocable [`Endpoint`] that coerces declared parameter types before calling
//!   the handler ([`Registry::endpoint`])
//!
//! ## Matching rules
//!
//! - Literal segments match case-insensitively; parameter values keep their case
//! - A literal child always wins over the parameter child at the same depth
//! - There is no backtracking once a segment has been consumed
//! - Empty segments are ignored, so `/pets/` and `//pets` both match `/pets`
//!
//! ## Example
//!
//! ```rust
//! use brrtmock::handler::HandlerBundle;
//! use brrtmock::router::Registry;
//! use http::Method;
//!
//! let registry = Registry::new();
//! registry.add("/pets/{id}", HandlerBundle::new().on(Method::GET, |_args| "a pet"));
//!
//! let matched = registry.handler("/PETS/42");
//! assert_eq!(matched.matched_template, "/pets/{id}");
//! assert_eq!(matched.param("id"), Some("42"));
//! assert!(registry.exists(&Method::GET, "/pets/42"));
//! assert!(!registry.exists(&Method::DELETE, "/pets/42"));
//! ```

mod core;
mod radix;
#[cfg(test)]
mod tests;

pub use core::{Endpoint, Registry};
pub use radix::{MatchResult, ParamVec, RouteEntry, RouteTree};
