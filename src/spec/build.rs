use super::types::{OpenApiDocument, Operation, ParameterLocation, ParameterMeta};
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const HTTP_METHODS: [&str; 8] = [
    "get", "post", "put", "delete", "patch", "options", "head", "trace",
];

/// Recursively expand all local `$ref` pointers in a value
///
/// Replaces `{"$ref": "#/..."}` objects with the value the JSON pointer names in
/// `root`. Pointers that do not resolve are left in place. A pointer met again
/// while its own target is still being expanded stays a `$ref` object, so
/// recursive schemas expand one level per path and never grow without bound.
///
/// # Arguments
///
/// * `root` - The whole document the pointers are resolved against
/// * `value` - The JSON value to process (modified in-place)
pub fn expand_refs(root: &Value, value: &mut Value) {
    let mut expanding = Vec::new();
    expand_refs_at(root, value, &mut expanding);
}

fn expand_refs_at(root: &Value, value: &mut Value, expanding: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            if let Some(pointer) = obj
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix('#'))
            {
                if expanding.iter().any(|p| p == pointer) {
                    debug!(pointer = %pointer, "Leaving recursive $ref unexpanded");
                    return;
                }
                if let Some(target) = root.pointer(pointer) {
                    let mut resolved = target.clone();
                    expanding.push(pointer.to_string());
                    expand_refs_at(root, &mut resolved, expanding);
                    expanding.pop();
                    *value = resolved;
                    return;
                }
            }
            for v in obj.values_mut() {
                expand_refs_at(root, v, expanding);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_refs_at(root, v, expanding);
            }
        }
        _ => {}
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract parameter metadata from a `parameters` array
///
/// Entries without a recognised `in` or without a `name` are skipped.
pub fn extract_parameters(params: Option<&Value>) -> Vec<ParameterMeta> {
    let Some(params) = params.and_then(Value::as_array) else {
        return Vec::new();
    };
    params
        .iter()
        .filter_map(|p| {
            let name = p.get("name")?.as_str()?;
            let location = ParameterLocation::parse(p.get("in")?.as_str()?)?;
            let schema = p.get("schema").cloned();
            let declared_type = schema
                .as_ref()
                .and_then(|s| s.get("type"))
                .or_else(|| p.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(ParameterMeta {
                name: name.to_string(),
                location,
                required: p.get("required").and_then(Value::as_bool).unwrap_or(false),
                declared_type,
                schema,
            })
        })
        .collect()
}

/// Operation-level parameters override path-level ones with the same name and location.
fn merge_parameters(path_level: &[ParameterMeta], op_level: Vec<ParameterMeta>) -> Vec<ParameterMeta> {
    let mut merged: Vec<ParameterMeta> = path_level
        .iter()
        .filter(|p| {
            !op_level
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    merged.extend(op_level);
    merged
}

/// Build an [`OpenApiDocument`] from a parsed document value
///
/// Works for both OpenAPI v2 (`swagger: "2.0"`) and v3 documents: v2's
/// `basePath` and `produces` are read when present, and an operation's own
/// `produces` wins over the document-level list.
pub fn build_document(mut value: Value) -> anyhow::Result<OpenApiDocument> {
    if !value.is_object() {
        anyhow::bail!("OpenAPI document must be a mapping at the top level");
    }
    let root = value.clone();
    expand_refs(&root, &mut value);

    let base_path = value
        .get("basePath")
        .and_then(Value::as_str)
        .map(str::to_string);
    let produces = string_list(value.get("produces"));

    let mut paths = Vec::new();
    let mut operations = HashMap::new();

    let empty = Map::new();
    let path_items = value
        .get("paths")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    for (path, item) in path_items {
        let Some(item) = item.as_object() else {
            warn!(path = %path, "Skipping path item that is not a mapping");
            continue;
        };
        paths.push(path.clone());
        let path_params = extract_parameters(item.get("parameters"));

        for (key, op) in item {
            let lower = key.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&lower.as_str()) {
                continue;
            }
            let Ok(method) = Method::from_bytes(lower.to_ascii_uppercase().as_bytes()) else {
                continue;
            };
            let own_produces = string_list(op.get("produces"));
            let operation = Operation {
                method: method.clone(),
                path: path.clone(),
                operation_id: op
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                parameters: merge_parameters(&path_params, extract_parameters(op.get("parameters"))),
                responses: op
                    .get("responses")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                produces: if own_produces.is_empty() {
                    produces.clone()
                } else {
                    own_produces
                },
            };
            debug!(
                method = %operation.method,
                path = %operation.path,
                operation_id = ?operation.operation_id,
                params = operation.parameters.len(),
                "Loaded operation"
            );
            operations.insert((path.to_lowercase(), method), Arc::new(operation));
        }
    }

    Ok(OpenApiDocument {
        base_path,
        produces,
        paths,
        operations,
    })
}
