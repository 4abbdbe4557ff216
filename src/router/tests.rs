use super::{Registry, RouteTree};
use crate::handler::{HandlerArgs, HandlerBundle, HandlerOutput};
use crate::response::ResponseDescriptor;
use crate::spec::ParameterTypes;
use http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

fn bundle(tag: &'static str) -> HandlerBundle {
    HandlerBundle::new().on(Method::GET, move |_args| tag)
}

fn body_of(output: HandlerOutput) -> Option<Value> {
    match output {
        HandlerOutput::Response(d) => d.body,
        HandlerOutput::Nothing => None,
    }
}

#[test]
fn test_root_path() {
    let mut tree = RouteTree::new();
    tree.add("/", bundle("root"));
    let matched = tree.match_path("/");
    assert!(matched.has_method(&Method::GET));
    assert_eq!(matched.matched_template, "/");
    assert!(matched.path_params.is_empty());
}

#[test]
fn test_literal_matching_is_case_insensitive() {
    let mut tree = RouteTree::new();
    tree.add("/Pets/Search", bundle("search"));
    let matched = tree.match_path("/pets/SEARCH");
    assert!(matched.has_method(&Method::GET));
    assert_eq!(matched.matched_template, "/Pets/Search");
}

#[test]
fn test_parameter_binds_original_case() {
    let mut tree = RouteTree::new();
    tree.add("/pets/{petId}", bundle("pet"));
    let matched = tree.match_path("/pets/Rex");
    assert_eq!(matched.param("petId"), Some("Rex"));
    assert_eq!(matched.matched_template, "/pets/{petId}");
}

#[test]
fn test_literal_wins_over_parameter() {
    let mut tree = RouteTree::new();
    tree.add("/pets/{id}", bundle("one"));
    tree.add("/pets/mine", bundle("mine"));
    let matched = tree.match_path("/pets/mine");
    assert_eq!(matched.matched_template, "/pets/mine");
    assert!(matched.path_params.is_empty());

    let matched = tree.match_path("/pets/7");
    assert_eq!(matched.matched_template, "/pets/{id}");
}

#[test]
fn test_no_backtracking() {
    let mut tree = RouteTree::new();
    tree.add("/pets/{id}/food", bundle("food"));
    tree.add("/pets/mine/toys", bundle("toys"));
    // "mine" commits to the literal branch, which has no "food" child
    let matched = tree.match_path("/pets/mine/food");
    assert!(matched.bundle.is_none());
    assert!(tree.match_path("/pets/7/food").bundle.is_some());
}

#[test]
fn test_empty_segments_ignored() {
    let mut tree = RouteTree::new();
    tree.add("/pets", bundle("pets"));
    assert!(tree.match_path("/pets/").bundle.is_some());
    assert!(tree.match_path("//pets").bundle.is_some());
}

#[test]
fn test_intermediate_node_has_no_bundle() {
    let mut tree = RouteTree::new();
    tree.add("/a/b/c", bundle("abc"));
    let matched = tree.match_path("/a/b");
    assert!(matched.bundle.is_none());
    assert_eq!(matched.matched_template, "/a/b");
}

#[test]
fn test_no_match_is_empty() {
    let tree = RouteTree::new();
    let matched = tree.match_path("/nothing/here");
    assert!(matched.bundle.is_none());
    assert!(matched.path_params.is_empty());
}

#[test]
fn test_re_add_merges_methods() {
    let mut tree = RouteTree::new();
    tree.add("/pets", HandlerBundle::new().on(Method::GET, |_args| "get"));
    tree.add("/pets", HandlerBundle::new().on(Method::POST, |_args| "post"));
    let matched = tree.match_path("/pets");
    assert!(matched.has_method(&Method::GET));
    assert!(matched.has_method(&Method::POST));
}

#[test]
fn test_wildcard_rename_last_write_wins() {
    let mut tree = RouteTree::new();
    tree.add("/users/{id}", bundle("user"));
    tree.add("/users/{userId}/posts", bundle("posts"));
    assert_eq!(tree.match_path("/users/9").param("userId"), Some("9"));
    assert_eq!(tree.match_path("/users/9").matched_template, "/users/{userId}");
}

#[test]
fn test_remove_unknown_is_false() {
    let mut tree = RouteTree::new();
    assert!(!tree.remove("/ghost"));
    tree.add("/a/b", bundle("ab"));
    assert!(!tree.remove("/a"));
    assert!(tree.remove("/a/b"));
    assert!(!tree.remove("/a/b"));
}

#[test]
fn test_routes_sorted_ignoring_braces() {
    let mut tree = RouteTree::new();
    tree.add("/pets/{id}", bundle("one"));
    tree.add("/owners", bundle("owners"));
    tree.add("/pets", bundle("pets"));
    tree.add("/pets/mine/toys", bundle("toys"));
    tree.remove("/pets/mine/toys");
    let paths: Vec<String> = tree.routes().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/owners", "/pets", "/pets/{id}"]);
}

#[test]
fn test_registry_add_then_remove_is_invisible() {
    let registry = Registry::new();
    registry.add("/hello/{name}", bundle("hi"));
    assert!(registry.exists(&Method::GET, "/hello/sam"));
    assert!(registry.remove("/hello/{name}"));

    assert!(!registry.exists(&Method::GET, "/hello/sam"));
    let endpoint = registry.endpoint(&Method::GET, "/hello/sam", &ParameterTypes::default());
    assert!(!endpoint.is_found());
    assert!(registry.routes().is_empty());
}

#[test]
fn test_registry_snapshot_survives_removal() {
    let registry = Registry::new();
    registry.add("/a", bundle("kept"));
    let matched = registry.handler("/a");
    registry.remove("/a");
    let handler = matched.bundle.as_ref().and_then(|b| b.get(&Method::GET)).unwrap();
    let out = handler.call(HandlerArgs::new(Method::GET)).unwrap();
    assert_eq!(body_of(out), Some(json!("kept")));
}

#[test]
fn test_endpoint_without_handler_is_404() {
    let registry = Registry::new();
    registry.add("/pets", bundle("pets"));
    let endpoint = registry.endpoint(&Method::DELETE, "/pets", &ParameterTypes::default());
    let out = endpoint.invoke(HandlerArgs::new(Method::DELETE)).unwrap();
    assert_eq!(
        out,
        HandlerOutput::Response(ResponseDescriptor::text(
            404,
            "Could not find a DELETE method matching /pets"
        ))
    );
}

#[test]
fn test_endpoint_coerces_declared_numbers() {
    let registry = Registry::new();
    registry.add(
        "/add/{x}/{y}",
        HandlerBundle::new().on(Method::GET, |args: HandlerArgs| {
            let x = args.path["x"].as_i64().unwrap_or_default();
            let y = args.path["y"].as_i64().unwrap_or_default();
            let page = args.query.get("page").cloned().unwrap_or(Value::Null);
            let trace = args.headers.get("x-trace").cloned().unwrap_or(Value::Null);
            json!({"sum": x + y, "page": page, "trace": trace}).to_string()
        }),
    );

    let mut types = ParameterTypes::default();
    types.path.insert("x".into(), "number".into());
    types.path.insert("y".into(), "number".into());
    types.query.insert("page".into(), "number".into());
    types.header.insert("x-trace".into(), "string".into());

    let mut args = HandlerArgs::new(Method::GET);
    args.query.insert("page".into(), json!("3"));
    args.headers.insert("x-trace".into(), json!("42"));

    let endpoint = registry.endpoint(&Method::GET, "/add/2/3", &types);
    let out = endpoint.invoke(args).unwrap();
    let body: Value = serde_json::from_str(body_of(out).unwrap().as_str().unwrap()).unwrap();
    assert_eq!(body, json!({"sum": 5, "page": 3, "trace": "42"}));
}

#[test]
fn test_endpoint_passes_extra_fields_through() {
    let registry = Registry::new();
    registry.add(
        "/ctx",
        HandlerBundle::new().on(Method::GET, |args: HandlerArgs| {
            args.context.get("greeting").and_then(|v| v.as_str().map(str::to_string))
        }),
    );
    let args = HandlerArgs::new(Method::GET);
    args.context.set("greeting", "hey");
    let out = registry
        .endpoint(&Method::GET, "/ctx", &ParameterTypes::default())
        .invoke(args)
        .unwrap();
    assert_eq!(body_of(out), Some(json!("hey")));
}

#[test]
fn test_concurrent_reads_during_writes() {
    let registry = Arc::new(Registry::new());
    registry.add("/stable", bundle("stable"));
    let writer = {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            for i in 0..200 {
                let path = format!("/churn/{i}");
                registry.add(&path, bundle("churn"));
                registry.remove(&path);
            }
        })
    };
    for _ in 0..2000 {
        assert!(registry.exists(&Method::GET, "/stable"));
    }
    writer.join().unwrap();
}
