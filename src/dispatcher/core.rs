use arc_swap::ArcSwapOption;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

use super::auth::parse_basic_auth;
use super::proxy::{Proxy, ProxyError};
use super::tools::Tools;
use crate::context::ContextStore;
use crate::handler::{HandlerArgs, HandlerError, HandlerOutput};
use crate::ids::RequestId;
use crate::negotiate::{self, AcceptParser};
use crate::response::{ResolvedResponse, ResponseBuilder, ResponseDescriptor};
use crate::router::{Endpoint, Registry};
use crate::spec::OpenApiDocument;

/// An inbound request as the transport hands it to [`Dispatcher::dispatch`].
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
    /// Point in time after which proxied calls are no longer attempted
    pub deadline: Option<Instant>,
}

impl DispatchRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug)]
pub enum DispatchError {
    /// A handler's `proxy.forward()` failed and the handler propagated it
    Proxy(ProxyError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Proxy(e) => write!(f, "proxy error: {e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Proxy(e) => Some(e),
        }
    }
}

impl From<ProxyError> for DispatchError {
    fn from(e: ProxyError) -> Self {
        DispatchError::Proxy(e)
    }
}

/// Routes a request to its handler and turns the handler's answer into a
/// [`ResolvedResponse`].
///
/// Steps, with early exits:
/// 1. strip the document's `basePath`
/// 2. route; unknown path or method is a 404
/// 3. correlate the matched template with the document's operation
/// 4. call the handler (panics become 500, returning nothing is a 500)
/// 5. negotiate `content` against `Accept`; no acceptable entry is a 406
pub struct Dispatcher {
    registry: Arc<Registry>,
    contexts: Arc<ContextStore>,
    document: ArcSwapOption<OpenApiDocument>,
    accept_parser: AcceptParser,
    proxy_client: Option<reqwest::blocking::Client>,
    proxy_timeout: Option<Duration>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<Registry>, contexts: Arc<ContextStore>) -> Self {
        Self {
            registry,
            contexts,
            document: ArcSwapOption::empty(),
            accept_parser: negotiate::parse_accept,
            proxy_client: None,
            proxy_timeout: None,
        }
    }

    #[must_use]
    pub fn with_document(self, document: OpenApiDocument) -> Self {
        self.set_document(Some(Arc::new(document)));
        self
    }

    #[must_use]
    pub fn with_accept_parser(mut self, parser: AcceptParser) -> Self {
        self.accept_parser = parser;
        self
    }

    /// Client reused by every `proxy.forward()`.
    #[must_use]
    pub fn with_proxy_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.proxy_client = Some(client);
        self
    }

    /// Upper bound for each proxied call, applied on top of the request deadline.
    #[must_use]
    pub fn with_proxy_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_timeout = Some(timeout);
        self
    }

    fn proxy(
        &self,
        method: Method,
        headers: Arc<HashMap<String, String>>,
        body: Option<Value>,
        path: String,
        deadline: Option<Instant>,
    ) -> Proxy {
        let proxy = Proxy::new(self.proxy_client.clone(), method, headers, body, path, deadline);
        match self.proxy_timeout {
            Some(timeout) => proxy.with_timeout(timeout),
            None => proxy,
        }
    }

    /// Swap the OpenAPI document; in-flight requests keep the one they loaded.
    pub fn set_document(&self, document: Option<Arc<OpenApiDocument>>) {
        self.document.store(document);
    }

    #[must_use]
    pub fn document(&self) -> Option<Arc<OpenApiDocument>> {
        self.document.load_full()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn contexts(&self) -> &Arc<ContextStore> {
        &self.contexts
    }

    pub fn dispatch(&self, request: DispatchRequest) -> Result<ResolvedResponse, DispatchError> {
        let span = info_span!(
            "dispatch",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path
        );
        let _enter = span.enter();

        let document = self.document.load_full();
        let path = match document.as_deref() {
            Some(doc) => doc.strip_base_path(&request.path).to_string(),
            None => request.path.clone(),
        };
        let method = request.method.clone();

        let matched = self.registry.handler(&path);
        if !matched.has_method(&method) {
            warn!(
                method = %method,
                path = %path,
                template_found = matched.bundle.is_some(),
                "No route matched"
            );
            return Ok(ResolvedResponse::text(
                404,
                format!("Could not find a {method} method matching {path}\n"),
            ));
        }

        let operation = document
            .as_deref()
            .and_then(|doc| doc.operation(&matched.matched_template, &method));
        let types = operation
            .as_deref()
            .map(|op| op.parameter_types())
            .unwrap_or_default();
        let template = matched.matched_template.clone();
        let endpoint = Endpoint::from_match(method.clone(), &path, matched, types);

        info!(
            template = %template,
            operation_id = ?operation.as_ref().and_then(|op| op.operation_id.clone()),
            "Route matched"
        );

        let accept = (self.accept_parser)(request.headers.get("accept").map(String::as_str));
        let headers = Arc::new(request.headers);
        let proxy_path = with_query(&path, &request.query);
        let args = HandlerArgs {
            method: method.clone(),
            path: Map::new(),
            query: to_value_map(&request.query),
            headers: to_value_map(&headers),
            body: request.body.clone(),
            context: self.contexts.find(&template),
            tools: Tools::new(accept.clone()),
            response: ResponseBuilder::new(operation),
            proxy: self.proxy(
                method.clone(),
                Arc::clone(&headers),
                request.body,
                proxy_path,
                request.deadline,
            ),
            auth: parse_basic_auth(headers.get("authorization").map(String::as_str)),
            matched_path: template,
        };

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| endpoint.invoke(args)));
        let descriptor = match outcome {
            Ok(Ok(HandlerOutput::Response(descriptor))) => descriptor,
            Ok(Ok(HandlerOutput::Nothing)) => {
                error!(method = %method, "Handler returned nothing");
                return Ok(ResolvedResponse::text(
                    500,
                    format!(
                        "The {method} function did not return anything. Did you forget a return statement?"
                    ),
                ));
            }
            Ok(Err(HandlerError::Proxy(e))) => {
                error!(method = %method, error = %e, "Handler proxy call failed");
                return Err(DispatchError::Proxy(e));
            }
            Ok(Err(HandlerError::Failed(e))) => {
                let message = format!("{e:#}");
                error!(method = %method, error = %message, "Handler failed");
                return Ok(ResolvedResponse::text(
                    500,
                    format!("The {method} function failed: {message}"),
                ));
            }
            Err(panic) => {
                let panic_message = panic_message(panic.as_ref());
                error!(
                    method = %method,
                    panic_message = %panic_message,
                    "Handler panicked - CRITICAL"
                );
                return Ok(ResolvedResponse::text(
                    500,
                    format!("The {method} function panicked: {panic_message}"),
                ));
            }
        };
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            status = descriptor.status.unwrap_or(200),
            "Handler execution complete"
        );

        Ok(resolve(descriptor, &accept))
    }

    /// Send the request straight to `url` without routing it.
    ///
    /// Used for proxy-mode prefixes; the upstream answer is negotiated like a
    /// handler's response.
    pub fn forward(&self, request: DispatchRequest, url: &str) -> Result<ResolvedResponse, DispatchError> {
        let span = info_span!(
            "forward",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path
        );
        let _enter = span.enter();

        let accept = (self.accept_parser)(request.headers.get("accept").map(String::as_str));
        let proxy = self.proxy(
            request.method,
            Arc::new(request.headers),
            request.body,
            with_query(&request.path, &request.query),
            request.deadline,
        );
        let descriptor = proxy.forward(url)?;
        info!(upstream = %url, status = descriptor.status.unwrap_or(200), "Forwarded request");
        Ok(resolve(descriptor, &accept))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("has_document", &self.document.load().is_some())
            .finish()
    }
}

/// Turn a handler's descriptor into the final response.
fn resolve(mut descriptor: ResponseDescriptor, accept: &[String]) -> ResolvedResponse {
    let status = descriptor.status.unwrap_or(200);
    let Some(content) = descriptor.content.take().filter(|c| !c.is_empty()) else {
        let content_type = descriptor
            .content_type
            .take()
            .or_else(|| descriptor.get_header("content-type").map(str::to_string));
        return ResolvedResponse {
            status,
            headers: descriptor.headers,
            content_type,
            body: descriptor.body,
        };
    };

    match negotiate::select(accept, &content) {
        Some(entry) => {
            debug!(status, content_type = %entry.media_type, "Negotiated representation");
            ResolvedResponse {
                status,
                headers: descriptor.headers,
                content_type: Some(entry.media_type.clone()),
                body: Some(entry.body.clone()),
            }
        }
        None => {
            let available: Vec<&str> = content.iter().map(|c| c.media_type.as_str()).collect();
            warn!(accept = ?accept, available = ?available, "No acceptable representation");
            ResolvedResponse::text(
                406,
                format!(
                    "Not Acceptable: none of [{}] satisfies the Accept header [{}]",
                    available.join(", "),
                    accept.join(", ")
                ),
            )
        }
    }
}

fn to_value_map(values: &HashMap<String, String>) -> Map<String, Value> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Path plus re-encoded query string, for forwarding.
fn with_query(path: &str, query: &HashMap<String, String>) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let mut pairs: Vec<(&String, &String)> = query.iter().collect();
    pairs.sort();
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{path}?{encoded}")
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
