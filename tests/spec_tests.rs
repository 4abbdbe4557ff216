use brrtmock::spec::{load_document, ParameterLocation};
use http::Method;
use serde_json::json;

mod common;
use common::fixtures::{PETSTORE_V2, PETSTORE_V3};
use common::temp_files;

#[test]
fn test_load_v2_yaml_file() {
    let path = temp_files::create_temp_yaml(PETSTORE_V2);
    let doc = load_document(&path).unwrap();

    assert_eq!(doc.base_path.as_deref(), Some("/v1"));
    assert_eq!(doc.produces, vec!["application/json", "application/xml"]);
    assert_eq!(doc.paths, vec!["/pets", "/pets/{petId}"]);
    assert_eq!(doc.operation_count(), 4);

    let get_pet = doc.operation("/pets/{petId}", &Method::GET).unwrap();
    assert_eq!(get_pet.operation_id.as_deref(), Some("getPet"));
    // path-level parameter merged into the operation
    assert_eq!(get_pet.parameters.len(), 1);
    assert_eq!(get_pet.parameters[0].location, ParameterLocation::Path);
    assert_eq!(get_pet.parameter_types().path["petId"], "number");
    // global produces inherited
    assert_eq!(get_pet.produces, doc.produces);
    // $ref expanded in the response schema
    let schema = &get_pet.responses["200"]["schema"];
    assert_eq!(schema["type"], json!("object"));
    assert_eq!(schema["required"], json!(["id", "name"]));

    let delete = doc.operation("/pets/{petId}", &Method::DELETE).unwrap();
    assert_eq!(delete.success_status(), 204);

    temp_files::cleanup_temp_files(&[path]);
}

#[test]
fn test_load_v3_json_file() {
    let value: serde_json::Value = serde_yaml::from_str(PETSTORE_V3).unwrap();
    let path = temp_files::create_temp_json(&serde_json::to_string_pretty(&value).unwrap());
    let doc = load_document(&path).unwrap();

    assert!(doc.base_path.is_none());
    assert_eq!(doc.operation_count(), 3);

    let get_pet = doc.operation("/PETS/{petId}", &Method::GET).unwrap();
    let types = get_pet.parameter_types();
    assert_eq!(types.path["petId"], "number");
    assert_eq!(types.query["verbose"], "boolean");
    assert_eq!(types.header["x-trace"], "number");
    assert_eq!(
        get_pet.responses["200"]["content"]["application/json"]["schema"]["properties"]["id"],
        json!({"type": "integer"})
    );
    assert!(get_pet.produces.is_empty());

    temp_files::cleanup_temp_files(&[path]);
}

#[test]
fn test_operations_grouped_by_path() {
    let path = temp_files::create_temp_yaml(PETSTORE_V2);
    let doc = load_document(&path).unwrap();
    let grouped = doc.operations_by_path();
    let pets = grouped
        .iter()
        .find(|(p, _)| p == "/pets")
        .map(|(_, ops)| ops.len());
    assert_eq!(pets, Some(2));
    temp_files::cleanup_temp_files(&[path]);
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_document("/no/such/openapi.yaml").unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("/no/such/openapi.yaml"));
}

#[test]
fn test_malformed_document_is_an_error() {
    let path = temp_files::create_temp_yaml("- just\n- a\n- list\n");
    assert!(load_document(&path).is_err());

    let bad_json = temp_files::create_temp_json("{ not json");
    assert!(load_document(&bad_json).is_err());

    temp_files::cleanup_temp_files(&[path, bad_json]);
}
