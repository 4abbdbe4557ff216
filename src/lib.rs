//! # brrtmock
//!
//! **brrtmock** is a mock-API server driven by an OpenAPI (v2 or v3) document, running on
//! the `may` coroutine runtime.
//!
//! ## Overview
//!
//! Point it at a document and every operation answers with a response fabricated from the
//! document's examples and schemas. Handlers can also be registered by hand, at runtime,
//! to script behavior: keep state in a per-path [`context`], pick a declared response
//! with the [`response`] builder, or forward to a real upstream with `proxy`.
//!
//! ## Architecture
//!
//! - **[`router`]** - case-insensitive route tree behind a copy-on-write [`router::Registry`]
//! - **[`context`]** - per-path-prefix state and methods shared by handlers
//! - **[`response`]** - status-scoped response builder, `random()` schema responses
//! - **[`negotiate`]** - `Accept` parsing and media-type matching
//! - **[`dispatcher`]** - request to handler to negotiated [`response::ResolvedResponse`]
//! - **[`spec`]** - OpenAPI loading, `$ref` expansion, operations keyed by path and method
//! - **[`mock`]** - random-response handlers for every operation in a document
//! - **[`hot_reload`]** - reload the document and resync routes when the file changes
//! - **[`server`]** - `may_minihttp` transport with CORS and proxy-mode prefixes
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService<br/>(may_minihttp)
//!     participant Dispatcher
//!     participant Registry
//!     participant Handler
//!
//!     Client->>Server: GET /v1/pets/7
//!     alt OPTIONS
//!         Server-->>Client: 204 + CORS headers
//!     end
//!     alt path under a proxy prefix
//!         Server->>Server: forward upstream
//!         Server-->>Client: upstream response
//!     end
//!     Server->>Dispatcher: dispatch(request)
//!     Dispatcher->>Dispatcher: strip basePath
//!     Dispatcher->>Registry: handler("/pets/7")
//!     alt no handler for method
//!         Dispatcher-->>Client: 404
//!     end
//!     Dispatcher->>Handler: HandlerArgs (params coerced per document)
//!     Handler-->>Dispatcher: ResponseDescriptor
//!     Dispatcher->>Dispatcher: negotiate content vs Accept
//!     alt nothing acceptable
//!         Dispatcher-->>Client: 406
//!     end
//!     Dispatcher-->>Server: ResolvedResponse
//!     Server-->>Client: status, headers, body
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use brrtmock::cli::start_server;
//! use brrtmock::config::AppConfig;
//! use brrtmock::runtime_config::RuntimeConfig;
//! use std::path::Path;
//!
//! let (handle, _watcher) = start_server(
//!     Path::new("openapi.yaml"),
//!     AppConfig::default(),
//!     RuntimeConfig::from_env(),
//!     true,
//! )?;
//! handle.join().ok();
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Runtime Considerations
//!
//! Handlers run on the request's `may` coroutine. Stack size is set with
//! `BRRTMOCK_STACK_SIZE`; blocking calls (such as `proxy.forward`) block only that
//! coroutine's worker thread.

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod dummy_value;
pub mod handler;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod mock;
pub mod negotiate;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;

pub use context::{Context, ContextStore, Scope};
pub use dispatcher::{DispatchRequest, Dispatcher};
pub use handler::{HandlerArgs, HandlerBundle, HandlerOutput, HandlerResult};
pub use response::{ResolvedResponse, ResponseDescriptor};
pub use router::Registry;
pub use spec::{load_document, OpenApiDocument};
