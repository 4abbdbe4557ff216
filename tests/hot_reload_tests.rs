use brrtmock::context::ContextStore;
use brrtmock::dispatcher::{DispatchRequest, Dispatcher};
use brrtmock::hot_reload::watch_document;
use brrtmock::mock;
use brrtmock::router::Registry;
use brrtmock::spec::load_document;
use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::temp_files;

const SPEC_V1: &str = r#"openapi: 3.0.3
info:
  title: Reload Test
  version: '1.0'
paths:
  /foo:
    get:
      responses:
        '200':
          description: OK
          content:
            application/json:
              example: {"version": 1}
  /gone:
    get:
      responses:
        '200': { description: OK }
"#;

const SPEC_V2: &str = r#"openapi: 3.0.3
info:
  title: Reload Test
  version: '2.0'
paths:
  /foo:
    get:
      responses:
        '200':
          description: OK
          content:
            application/json:
              example: {"version": 2}
  /bar:
    post:
      responses:
        '201': { description: created }
"#;

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..60 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

fn get(path: &str) -> DispatchRequest {
    DispatchRequest::new(Method::GET, path)
}

#[test]
fn test_watch_document_reload_resyncs_routes() {
    let path = temp_files::create_temp_yaml(SPEC_V1);
    let document = load_document(&path).unwrap();
    let registry = Arc::new(Registry::new());
    mock::register_document(&registry, &document);
    let dispatcher = Arc::new(
        Dispatcher::new(Arc::clone(&registry), Arc::new(ContextStore::new())).with_document(document),
    );
    assert_eq!(
        dispatcher.dispatch(get("/foo")).unwrap().body,
        Some(json!({"version": 1}))
    );

    let reloads = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&reloads);
    let watcher = watch_document(&path, Arc::clone(&dispatcher), move |d, previous, next| {
        mock::sync_document(d.registry(), previous, next);
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .expect("watch_document");

    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));
    std::fs::write(&path, SPEC_V2).unwrap();

    assert!(wait_until(|| {
        reloads.load(Ordering::SeqCst) > 0
            && dispatcher.dispatch(get("/foo")).unwrap().body == Some(json!({"version": 2}))
    }));
    assert_eq!(dispatcher.dispatch(get("/gone")).unwrap().status, 404);
    let created = dispatcher
        .dispatch(DispatchRequest::new(Method::POST, "/bar"))
        .unwrap();
    assert_eq!(created.status, 201);

    drop(watcher);
    temp_files::cleanup_temp_files(&[path]);
}

#[test]
fn test_broken_reload_keeps_previous_document() {
    let path = temp_files::create_temp_yaml(SPEC_V1);
    let document = load_document(&path).unwrap();
    let registry = Arc::new(Registry::new());
    mock::register_document(&registry, &document);
    let dispatcher = Arc::new(
        Dispatcher::new(registry, Arc::new(ContextStore::new())).with_document(document),
    );

    let reloads = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&reloads);
    let watcher = watch_document(&path, Arc::clone(&dispatcher), move |_, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .expect("watch_document");

    std::thread::sleep(Duration::from_millis(100));
    std::fs::write(&path, "paths: [unterminated").unwrap();
    std::thread::sleep(Duration::from_millis(500));

    assert_eq!(reloads.load(Ordering::SeqCst), 0);
    let doc = dispatcher.document().unwrap();
    assert!(doc.operation("/foo", &Method::GET).is_some());
    assert_eq!(
        dispatcher.dispatch(get("/foo")).unwrap().body,
        Some(json!({"version": 1}))
    );

    drop(watcher);
    temp_files::cleanup_temp_files(&[path]);
}
