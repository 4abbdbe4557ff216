//! Handlers generated from an OpenAPI document.
//!
//! Every operation gets a handler that answers with
//! `response.for_status(s).random()`, where `s` is the operation's lowest declared
//! 2xx status (200 if none). Loading a document is therefore enough to serve a
//! working mock of the API.

use crate::handler::{HandlerArgs, HandlerBundle};
use crate::router::{Registry, RouteTree};
use crate::spec::{OpenApiDocument, Operation};
use std::collections::HashSet;
use tracing::info;

/// Answer with a random response for the operation's success status.
pub fn random_response(args: HandlerArgs) -> crate::response::StatusResponse {
    let status = args
        .response
        .operation()
        .map_or(200, Operation::success_status);
    args.response.for_status(status).random()
}

fn bundle_for(operations: &[std::sync::Arc<Operation>]) -> HandlerBundle {
    operations.iter().fold(HandlerBundle::new(), |bundle, op| {
        bundle.on(op.method.clone(), random_response)
    })
}

fn add_document(tree: &mut RouteTree, document: &OpenApiDocument) -> usize {
    let mut count = 0;
    for (path, operations) in document.operations_by_path() {
        if operations.is_empty() {
            continue;
        }
        count += operations.len();
        tree.add(&path, bundle_for(&operations));
    }
    count
}

/// Register a random-response handler for every operation in `document`.
///
/// Returns the number of operations registered.
pub fn register_document(registry: &Registry, document: &OpenApiDocument) -> usize {
    let count = registry.update(|tree| add_document(tree, document));
    info!(
        operations = count,
        paths = document.paths.len(),
        "Registered document handlers"
    );
    count
}

/// Bring the registry in line with a reloaded document.
///
/// Paths of `previous` are cleared and `next` is registered, all in one published
/// snapshot, so requests see either the old routes or the new ones.
pub fn sync_document(registry: &Registry, previous: Option<&OpenApiDocument>, next: &OpenApiDocument) -> usize {
    let next_paths: HashSet<String> = next.paths.iter().map(|p| p.to_lowercase()).collect();
    let (removed, count) = registry.update(|tree| {
        let mut removed = 0;
        for path in previous.map(|doc| doc.paths.as_slice()).unwrap_or_default() {
            if tree.remove(path) && !next_paths.contains(&path.to_lowercase()) {
                removed += 1;
            }
        }
        (removed, add_document(tree, next))
    });
    info!(operations = count, removed_paths = removed, "Document handlers resynced");
    count
}
