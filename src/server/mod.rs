//! HTTP transport on `may_minihttp`.
//!
//! [`AppService`] parses each request, answers CORS preflights, forwards
//! proxy-mode prefixes upstream and hands everything else to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher). [`HttpServer`] binds it to a
//! socket.

mod cors;
mod http_server;
mod request;
mod response;
mod service;

pub use cors::CorsPolicy;
pub use http_server::{HttpServer, ServerHandle};
pub use request::{decode_body, parse_query_params, parse_request, ParsedRequest};
pub use response::{header_lines, status_reason, write_resolved, LineTable};
pub use service::AppService;
