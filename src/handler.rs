//! User-supplied request handlers and what they receive and return.

use crate::context::Context;
use crate::dispatcher::{BasicAuth, Proxy, ProxyError, Tools};
use crate::response::{ResponseBuilder, ResponseDescriptor, StatusResponse};
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a handler is called with.
#[derive(Debug, Clone)]
pub struct HandlerArgs {
    pub method: Method,
    /// Path parameters, numbers already coerced where declared
    pub path: Map<String, Value>,
    pub query: Map<String, Value>,
    /// Request headers with lowercased names
    pub headers: Map<String, Value>,
    pub body: Option<Value>,
    /// Context of the longest registered prefix of the matched template
    pub context: Arc<Context>,
    pub tools: Tools,
    pub response: ResponseBuilder,
    pub proxy: Proxy,
    pub auth: Option<BasicAuth>,
    /// The route template that matched, e.g. `/pets/{id}`
    pub matched_path: String,
}

impl HandlerArgs {
    /// Arguments with nothing filled in but the method.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            path: Map::new(),
            query: Map::new(),
            headers: Map::new(),
            body: None,
            context: Arc::new(Context::default()),
            tools: Tools::default(),
            response: ResponseBuilder::default(),
            proxy: Proxy::default(),
            auth: None,
            matched_path: String::new(),
        }
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&Value> {
        self.path.get(name)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(&name.to_ascii_lowercase())
    }
}

/// What a handler produced: a response, or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// The handler returned without a response
    Nothing,
    Response(ResponseDescriptor),
}

#[derive(Debug)]
pub enum HandlerError {
    /// Proxying failed; propagated to the caller of `dispatch`
    Proxy(ProxyError),
    /// Any other handler failure; answered with a 500
    Failed(anyhow::Error),
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Proxy(e) => write!(f, "{e}"),
            HandlerError::Failed(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Proxy(e) => Some(e),
            HandlerError::Failed(e) => Some(e.as_ref()),
        }
    }
}

impl From<ProxyError> for HandlerError {
    fn from(e: ProxyError) -> Self {
        HandlerError::Proxy(e)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        HandlerError::Failed(e)
    }
}

pub type HandlerResult = Result<HandlerOutput, HandlerError>;

/// Anything a handler closure may return.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for HandlerOutput {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoHandlerResult for ResponseDescriptor {
    fn into_handler_result(self) -> HandlerResult {
        Ok(HandlerOutput::Response(self))
    }
}

impl IntoHandlerResult for StatusResponse {
    fn into_handler_result(self) -> HandlerResult {
        Ok(HandlerOutput::Response(self.into_descriptor()))
    }
}

impl IntoHandlerResult for String {
    fn into_handler_result(self) -> HandlerResult {
        Ok(HandlerOutput::Response(ResponseDescriptor::from(self)))
    }
}

impl IntoHandlerResult for &str {
    fn into_handler_result(self) -> HandlerResult {
        Ok(HandlerOutput::Response(ResponseDescriptor::from(self)))
    }
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(HandlerOutput::Nothing)
    }
}

impl<T: IntoHandlerResult> IntoHandlerResult for Option<T> {
    fn into_handler_result(self) -> HandlerResult {
        match self {
            Some(inner) => inner.into_handler_result(),
            None => Ok(HandlerOutput::Nothing),
        }
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<HandlerError>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)?.into_handler_result()
    }
}

type HandlerFn = dyn Fn(HandlerArgs) -> HandlerResult + Send + Sync;

/// A callable request handler.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self(Arc::new(move |args| f(args).into_handler_result()))
    }

    pub fn call(&self, args: HandlerArgs) -> HandlerResult {
        (self.0)(args)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Handler")
    }
}

/// Handlers for one path template, keyed by HTTP method.
#[derive(Clone, Default)]
pub struct HandlerBundle {
    handlers: HashMap<Method, Handler>,
}

impl HandlerBundle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert) from a closure.
    #[must_use]
    pub fn on<F, R>(mut self, method: Method, f: F) -> Self
    where
        F: Fn(HandlerArgs) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.insert(method, Handler::new(f));
        self
    }

    pub fn insert(&mut self, method: Method, handler: Handler) -> Option<Handler> {
        self.handlers.insert(method, handler)
    }

    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&Handler> {
        self.handlers.get(method)
    }

    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.handlers.contains_key(method)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Methods in alphabetical order.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.handlers.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// `self` with `other`'s handlers layered on top.
    #[must_use]
    pub fn merged_with(&self, other: HandlerBundle) -> HandlerBundle {
        let mut merged = self.clone();
        merged.handlers.extend(other.handlers);
        merged
    }
}

impl std::fmt::Debug for HandlerBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBundle")
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_return_is_plain_text() {
        let handler = Handler::new(|_args| "hello");
        let out = handler.call(HandlerArgs::new(Method::GET)).unwrap();
        assert_eq!(out, HandlerOutput::Response(ResponseDescriptor::text(200, "hello")));
    }

    #[test]
    fn test_unit_return_is_nothing() {
        let handler = Handler::new(|_args| {});
        let out = handler.call(HandlerArgs::new(Method::GET)).unwrap();
        assert_eq!(out, HandlerOutput::Nothing);
    }

    #[test]
    fn test_result_error_converts() {
        let handler = Handler::new(|_args| -> Result<String, anyhow::Error> {
            Err(anyhow::anyhow!("boom"))
        });
        let err = handler.call(HandlerArgs::new(Method::GET)).unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_bundle_merge_last_write_wins() {
        let first = HandlerBundle::new()
            .on(Method::GET, |_args| "first")
            .on(Method::POST, |_args| "post");
        let second = HandlerBundle::new().on(Method::GET, |_args| "second");
        let merged = first.merged_with(second);
        assert_eq!(merged.methods(), vec![Method::GET, Method::POST]);
        let out = merged
            .get(&Method::GET)
            .unwrap()
            .call(HandlerArgs::new(Method::GET))
            .unwrap();
        assert_eq!(out, HandlerOutput::Response(ResponseDescriptor::text(200, "second")));
    }
}
