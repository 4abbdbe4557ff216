//! Shared per-path-prefix state handed to handlers as `args.context`.
//!
//! A [`ContextStore`] maps path prefixes (`/`, `/pets`, `/pets/{id}`) to
//! [`Context`] objects. Handlers find theirs via the longest registered ancestor
//! of their matched template, so a context at `/pets` is shared by `/pets` and
//! `/pets/{id}` unless the latter registers its own.
//!
//! A context has two parts: *fields*, mutable JSON state that handlers read and
//! write, and *methods*, named behaviour that operates on those fields. Hot reload
//! through [`ContextStore::update`] keeps the fields a running server has built up
//! and swaps the behaviour.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// The mutable state of a context.
pub type Fields = Map<String, Value>;

/// A named operation on a context's fields.
pub type ScopeMethod = Arc<dyn Fn(&mut Fields, Value) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, ScopeMethod>,
}

impl MethodTable {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ScopeMethod> {
        self.methods.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, method: ScopeMethod) {
        self.methods.insert(name.into(), method);
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A definition of context state and behaviour, registered with [`ContextStore::add`].
#[derive(Debug, Clone, Default)]
pub struct Scope {
    fields: Fields,
    methods: MethodTable,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            methods: MethodTable::default(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut Fields, Value) -> Value + Send + Sync + 'static,
    {
        self.methods.insert(name, Arc::new(method));
        self
    }
}

/// A live context object. Identity is stable for the life of the store entry.
#[derive(Default)]
pub struct Context {
    fields: Mutex<Fields>,
    methods: ArcSwap<MethodTable>,
}

impl Context {
    #[must_use]
    pub fn from_scope(scope: Scope) -> Self {
        Self {
            fields: Mutex::new(scope.fields),
            methods: ArcSwap::from_pointee(scope.methods),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Fields> {
        // a handler that panicked mid-update leaves whatever it wrote
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).cloned()
    }

    /// Set a field, returning the previous value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.lock().insert(name.into(), value.into())
    }

    /// Run `f` with exclusive access to the fields.
    pub fn with_fields<R>(&self, f: impl FnOnce(&mut Fields) -> R) -> R {
        f(&mut self.lock())
    }

    /// Call a named method; `None` if the context has no such method.
    ///
    /// The method runs while holding the field lock, so concurrent calls on the
    /// same context are serialized.
    pub fn call(&self, name: &str, args: Value) -> Option<Value> {
        let method = Arc::clone(self.methods.load().get(name)?);
        let mut fields = self.lock();
        Some(method(&mut fields, args))
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.load().get(name).is_some()
    }

    /// A copy of the current fields.
    #[must_use]
    pub fn snapshot(&self) -> Fields {
        self.lock().clone()
    }

    fn refresh(&self, scope: Scope) {
        {
            let mut fields = self.lock();
            for (name, value) in scope.fields {
                fields.entry(name).or_insert(value);
            }
        }
        self.methods.store(Arc::new(scope.methods));
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("fields", &self.snapshot())
            .field("methods", &self.methods.load().names())
            .finish()
    }
}

#[derive(Debug)]
pub enum ContextError {
    /// `add` was called without a scope
    MissingScope { prefix: String },
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::MissingScope { prefix } => {
                write!(f, "cannot add a context at '{prefix}' without a scope")
            }
        }
    }
}

impl std::error::Error for ContextError {}

/// Prefix without trailing slashes; the empty prefix is `/`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The prefix one segment up; the parent of a top-level prefix is `/`.
fn parent_prefix(prefix: &str) -> &str {
    match prefix.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &prefix[..i],
    }
}

/// Path prefix to context registry.
///
/// The root `/` always has an entry. Each context guards its own fields, so
/// handlers on unrelated prefixes never contend.
#[derive(Debug)]
pub struct ContextStore {
    entries: DashMap<String, Arc<Context>>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    #[must_use]
    pub fn new() -> Self {
        let entries = DashMap::new();
        entries.insert("/".to_string(), Arc::new(Context::default()));
        Self { entries }
    }

    /// Register a context at an exact prefix, replacing any existing one.
    pub fn add(&self, prefix: &str, scope: Option<Scope>) -> Result<Arc<Context>, ContextError> {
        let Some(scope) = scope else {
            return Err(ContextError::MissingScope {
                prefix: prefix.to_string(),
            });
        };
        let key = normalize_prefix(prefix);
        let context = Arc::new(Context::from_scope(scope));
        self.entries.insert(key.clone(), Arc::clone(&context));
        info!(prefix = %key, "Context registered");
        Ok(context)
    }

    /// The context of the longest registered ancestor of `path` (inclusive).
    #[must_use]
    pub fn find(&self, path: &str) -> Arc<Context> {
        let normalized = normalize_prefix(path);
        let mut current = normalized.as_str();
        loop {
            if let Some(entry) = self.entries.get(current) {
                return Arc::clone(entry.value());
            }
            if current == "/" {
                break;
            }
            current = parent_prefix(current);
        }
        Arc::clone(
            self.entries
                .entry("/".to_string())
                .or_insert_with(|| Arc::new(Context::default()))
                .value(),
        )
    }

    /// Refresh the context at `prefix` from a reloaded scope.
    ///
    /// Fields already present on the live context keep their runtime values; only
    /// missing ones are copied in. The method table is replaced wholesale. With no
    /// entry at exactly `prefix`, a fresh context is registered there; ancestors
    /// are never touched.
    pub fn update(&self, prefix: &str, scope: Scope) -> Arc<Context> {
        let key = normalize_prefix(prefix);
        let context = Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Context::default()))
                .value(),
        );
        context.refresh(scope);
        debug!(prefix = %key, "Context refreshed");
        context
    }

    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.entries.contains_key(&normalize_prefix(prefix))
    }

    /// Registered prefixes, sorted.
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        prefixes.sort();
        prefixes
    }
}
