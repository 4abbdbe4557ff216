use arc_swap::ArcSwap;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use super::radix::{MatchResult, ParamVec, RouteEntry, RouteTree};
use crate::handler::{Handler, HandlerArgs, HandlerBundle, HandlerOutput, HandlerResult};
use crate::response::ResponseDescriptor;
use crate::spec::ParameterTypes;

/// Registered handlers, looked up by request path.
///
/// Reads load the current [`RouteTree`] snapshot without locking. Writers clone the
/// tree, change the clone and publish it, serialized by a writer mutex. A request
/// that already holds a bundle finishes with it even if the route is removed
/// meanwhile.
pub struct Registry {
    tree: ArcSwap<RouteTree>,
    writer: Mutex<()>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: ArcSwap::from_pointee(RouteTree::new()),
            writer: Mutex::new(()),
        }
    }

    /// Apply several changes as one published snapshot.
    pub fn update<R>(&self, f: impl FnOnce(&mut RouteTree) -> R) -> R {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = RouteTree::clone(&self.tree.load());
        let out = f(&mut next);
        self.tree.store(Arc::new(next));
        out
    }

    pub fn add(&self, template: &str, bundle: HandlerBundle) {
        let methods = bundle.methods();
        self.update(|tree| tree.add(template, bundle));
        info!(template = %template, methods = ?methods, "Route registered");
    }

    pub fn remove(&self, template: &str) -> bool {
        let removed = self.update(|tree| tree.remove(template));
        info!(template = %template, removed, "Route removed");
        removed
    }

    /// The current tree snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RouteTree> {
        self.tree.load_full()
    }

    #[must_use]
    pub fn handler(&self, path: &str) -> MatchResult {
        self.tree.load().match_path(path)
    }

    #[must_use]
    pub fn exists(&self, method: &Method, path: &str) -> bool {
        self.handler(path).has_method(method)
    }

    /// An invocable for `method` on `path`, coercing parameters per `types`.
    #[must_use]
    pub fn endpoint(&self, method: &Method, path: &str, types: &ParameterTypes) -> Endpoint {
        Endpoint::from_match(method.clone(), path, self.handler(path), types.clone())
    }

    #[must_use]
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.tree.load().routes()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("routes", &self.routes())
            .finish()
    }
}

/// A resolved handler call waiting for its arguments.
#[derive(Debug, Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    handler: Option<Handler>,
    path_params: ParamVec,
    matched_template: String,
    types: ParameterTypes,
}

impl Endpoint {
    #[must_use]
    pub fn from_match(method: Method, path: &str, matched: MatchResult, types: ParameterTypes) -> Self {
        let handler = matched
            .bundle
            .as_ref()
            .and_then(|bundle| bundle.get(&method))
            .cloned();
        Self {
            method,
            path: path.to_string(),
            handler,
            path_params: matched.path_params,
            matched_template: matched.matched_template,
            types,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.handler.is_some()
    }

    #[must_use]
    pub fn matched_template(&self) -> &str {
        &self.matched_template
    }

    /// Call the handler with coerced `path`, `query` and `headers`.
    ///
    /// Every other field of `args` is passed through untouched. Without a handler
    /// this answers 404.
    pub fn invoke(&self, mut args: HandlerArgs) -> HandlerResult {
        let Some(handler) = &self.handler else {
            return Ok(HandlerOutput::Response(ResponseDescriptor::text(
                404,
                format!("Could not find a {} method matching {}", self.method, self.path),
            )));
        };

        args.path = self
            .path_params
            .iter()
            .map(|(name, raw)| {
                let value = coerce(Value::String(raw.clone()), self.types.path.get(name.as_ref()));
                (name.to_string(), value)
            })
            .collect();
        args.query = coerce_all(std::mem::take(&mut args.query), &self.types.query);
        args.headers = coerce_all(std::mem::take(&mut args.headers), &self.types.header);

        debug!(
            method = %self.method,
            template = %self.matched_template,
            path_params = ?args.path,
            "Invoking handler"
        );
        handler.call(args)
    }
}

fn coerce_all(values: Map<String, Value>, types: &HashMap<String, String>) -> Map<String, Value> {
    if types.is_empty() {
        return values;
    }
    values
        .into_iter()
        .map(|(name, value)| {
            let value = coerce(value, types.get(&name));
            (name, value)
        })
        .collect()
}

/// Declared `number` turns a string into an integer; everything else passes through.
fn coerce(value: Value, declared: Option<&String>) -> Value {
    if declared.map(String::as_str) != Some("number") {
        return value;
    }
    let parsed = value.as_str().and_then(parse_leading_int);
    parsed.map_or(value, Value::from)
}

/// Base-10 integer from the start of `raw`: `"42abc"` is 42, `"abc"` is nothing.
///
/// Values outside the `i64` range are also nothing, so they reach the handler as
/// the original string.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let sign = usize::from(matches!(trimmed.as_bytes().first(), Some(b'-' | b'+')));
    let end = trimmed[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed.len(), |i| sign + i);
    if end == sign {
        return None;
    }
    trimmed[..end].parse().ok()
}
