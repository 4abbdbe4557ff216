//! # Dispatcher Module
//!
//! Takes a parsed request through routing, handler invocation and content
//! negotiation, producing the `{status, headers, contentType, body}` the
//! transport writes back.
//!
//! ## Request Flow
//!
//! 1. `basePath` from the loaded OpenAPI document is stripped from the path
//! 2. The [`Registry`](crate::router::Registry) matches the path; a missing route
//!    or method answers 404
//! 3. The matched template is looked up in the document (case-insensitively) to
//!    find the operation, which drives parameter coercion and `response.random()`
//! 4. The handler runs inline on the calling coroutine with [`HandlerArgs`]
//!    (context, tools, response builder, proxy, Basic auth)
//! 5. A response offering several representations is negotiated against `Accept`
//!
//! ## Error Handling
//!
//! - Missing handlers return 404 responses
//! - Handler panics are caught and return 500 responses
//! - A handler returning nothing is a 500 naming the method
//! - A failed `proxy.forward()` propagated with `?` comes back as
//!   [`DispatchError::Proxy`]; the transport decides what the client sees
//!
//! [`HandlerArgs`]: crate::handler::HandlerArgs

mod auth;
mod core;
mod proxy;
mod tools;

pub use auth::{parse_basic_auth, BasicAuth};
pub use core::{DispatchError, DispatchRequest, Dispatcher};
pub use proxy::{Proxy, ProxyError, DEFAULT_PROXY_TIMEOUT};
pub use tools::Tools;
