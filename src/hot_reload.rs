//! # Hot Reload Module
//!
//! Live reloading of the OpenAPI document without restarting the server.
//!
//! ## Overview
//!
//! [`watch_document`] watches the document file and, on every modification:
//! - reloads and parses the document
//! - swaps it into the [`Dispatcher`] (in-flight requests keep the old one)
//! - calls the reload hook with the previous and new documents, typically to
//!   resync document-driven handlers with [`mock::sync_document`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brrtmock::hot_reload::watch_document;
//! use brrtmock::mock;
//!
//! let watcher = watch_document("openapi.yaml", dispatcher.clone(), |dispatcher, previous, next| {
//!     mock::sync_document(dispatcher.registry(), previous, next);
//! })?;
//!
//! // Keep the watcher alive for as long as reloads should happen
//! ```
//!
//! ## Error Handling
//!
//! If the new document fails to load:
//! - The error is logged
//! - The previous document remains active
//! - The server continues serving requests
//!
//! Saving a half-edited document therefore never takes the mock down.
//!
//! [`mock::sync_document`]: crate::mock::sync_document

use crate::dispatcher::Dispatcher;
use crate::spec::{self, OpenApiDocument};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Watch an OpenAPI document and swap it into `dispatcher` when it changes.
///
/// `on_reload` receives the dispatcher, the document that was replaced (if any)
/// and the new one, after the swap.
pub fn watch_document<P, F>(
    document_path: P,
    dispatcher: Arc<Dispatcher>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&Dispatcher, Option<&OpenApiDocument>, &OpenApiDocument) + Send + 'static,
{
    let path: PathBuf = document_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                match spec::load_document(&watch_path) {
                    Ok(document) => {
                        let document = Arc::new(document);
                        let previous = dispatcher.document();
                        dispatcher.set_document(Some(Arc::clone(&document)));
                        info!(
                            path = %watch_path.display(),
                            operations = document.operation_count(),
                            "hot-reload: document applied"
                        );
                        on_reload(&dispatcher, previous.as_deref(), &document);
                    }
                    Err(e) => {
                        warn!(
                            path = %watch_path.display(),
                            error = %format!("{e:#}"),
                            "hot-reload: keeping previous document"
                        );
                    }
                }
            }
            Err(e) => error!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
