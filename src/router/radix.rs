//! Segment tree for path template matching
//!
//! Templates are split on `/` into segments. Each node of the tree is one path
//! depth and has:
//! - literal children keyed by the lowercased segment text
//! - at most one wildcard child, created by a `{name}` segment
//! - an optional [`HandlerBundle`], present iff some template ends at the node
//!
//! Matching walks one segment at a time, preferring a literal child over the
//! wildcard and never backtracking: if `/pets/mine/toys` is registered, a request
//! for `/pets/mine/food` does not fall back to `/pets/{id}/food`.
//!
//! The tree itself is plain data; [`Registry`](super::Registry) wraps it in a
//! copy-on-write snapshot so lookups never wait on writers.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::handler::HandlerBundle;
use http::Method;

/// Path parameter storage; most templates have one or two parameters.
pub type ParamVec = SmallVec<[(Arc<str>, String); 4]>;

#[derive(Clone, Default)]
struct RouteNode {
    /// Segment as first registered; `{name}` for the wildcard child
    segment: String,
    /// Parameter bound by this node when it is a wildcard child
    param_name: Option<Arc<str>>,
    children: HashMap<String, RouteNode>,
    wildcard: Option<Box<RouteNode>>,
    bundle: Option<Arc<HandlerBundle>>,
}

impl RouteNode {
    fn literal(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    fn param(name: &str) -> Self {
        Self {
            segment: format!("{{{name}}}"),
            param_name: Some(Arc::from(name)),
            ..Self::default()
        }
    }
}

/// Non-empty segments of a path or template.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// `Some(name)` for a `{name}` segment
fn param_name(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('{')?;
    Some(inner.strip_suffix('}').unwrap_or(inner))
}

/// Outcome of matching a request path against the tree.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Bundle at the matched node; `None` when nothing matched or nothing ends there
    pub bundle: Option<Arc<HandlerBundle>>,
    /// Parameter name to raw segment text, in path order
    pub path_params: ParamVec,
    /// Template rebuilt from the traversed nodes, e.g. `/pets/{id}`
    pub matched_template: String,
}

impl MatchResult {
    #[must_use]
    pub fn has_method(&self, method: &Method) -> bool {
        self.bundle.as_ref().is_some_and(|b| b.contains(method))
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One registered template and the methods it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: String,
    pub methods: Vec<Method>,
}

#[derive(Clone, Default)]
pub struct RouteTree {
    root: RouteNode,
}

impl RouteTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bundle` at `template`, merging with any bundle already there.
    ///
    /// A `{name}` segment reuses the node's wildcard child. If that child was
    /// created with a different name, the new name wins for every template that
    /// shares the node.
    pub fn add(&mut self, template: &str, bundle: HandlerBundle) {
        let mut node = &mut self.root;
        for segment in segments(template) {
            node = match param_name(segment) {
                Some(name) => {
                    let child: &mut RouteNode = node
                        .wildcard
                        .get_or_insert_with(|| Box::new(RouteNode::param(name)));
                    if child.param_name.as_deref() != Some(name) {
                        warn!(
                            template = %template,
                            previous = ?child.param_name,
                            renamed_to = %name,
                            "Path parameter renamed at shared wildcard node"
                        );
                        child.segment = format!("{{{name}}}");
                        child.param_name = Some(Arc::from(name));
                    }
                    child
                }
                None => node
                    .children
                    .entry(segment.to_lowercase())
                    .or_insert_with(|| RouteNode::literal(segment)),
            };
        }
        let merged = match node.bundle.take() {
            Some(existing) => existing.merged_with(bundle),
            None => bundle,
        };
        node.bundle = Some(Arc::new(merged));
    }

    /// Clear the bundle at `template`; `false` if nothing was registered there.
    ///
    /// Nodes are kept, so a later `add` of the same template reuses them.
    pub fn remove(&mut self, template: &str) -> bool {
        let mut node = &mut self.root;
        for segment in segments(template) {
            let next = if param_name(segment).is_some() {
                node.wildcard.as_deref_mut()
            } else {
                node.children.get_mut(&segment.to_lowercase())
            };
            match next {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.bundle.take().is_some()
    }

    /// Match a concrete request path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> MatchResult {
        let mut node = &self.root;
        let mut path_params = ParamVec::new();
        let mut template = String::with_capacity(path.len());

        for segment in segments(path) {
            if let Some(child) = node.children.get(&segment.to_lowercase()) {
                node = child;
            } else if let Some(child) = node.wildcard.as_deref() {
                if let Some(name) = &child.param_name {
                    path_params.push((Arc::clone(name), segment.to_string()));
                }
                node = child;
            } else {
                return MatchResult::default();
            }
            template.push('/');
            template.push_str(&node.segment);
        }
        if template.is_empty() {
            template.push('/');
        }

        MatchResult {
            bundle: node.bundle.clone(),
            path_params,
            matched_template: template,
        }
    }

    /// Every template with a non-empty bundle, sorted with braces ignored.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteEntry> {
        let mut out = Vec::new();
        collect(&self.root, String::new(), &mut out);
        out.sort_by_cached_key(|entry| entry.path.replace(['{', '}'], ""));
        out
    }
}

fn collect(node: &RouteNode, prefix: String, out: &mut Vec<RouteEntry>) {
    if let Some(bundle) = node.bundle.as_ref().filter(|b| !b.is_empty()) {
        out.push(RouteEntry {
            path: if prefix.is_empty() { "/".to_string() } else { prefix.clone() },
            methods: bundle.methods(),
        });
    }
    for child in node.children.values() {
        collect(child, format!("{prefix}/{}", child.segment), out);
    }
    if let Some(child) = node.wildcard.as_deref() {
        collect(child, format!("{prefix}/{}", child.segment), out);
    }
}
