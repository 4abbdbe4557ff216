use super::build::build_document;
use super::types::OpenApiDocument;
use anyhow::Context as _;
use std::path::Path;

/// Load an OpenAPI document from a YAML or JSON file.
///
/// The format is picked by extension: `.yaml`/`.yml` are YAML, anything else JSON.
pub fn load_document(file_path: impl AsRef<Path>) -> anyhow::Result<OpenApiDocument> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read OpenAPI document {}", file_path.display()))?;
    let is_yaml = matches!(
        file_path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    parse_document(&content, is_yaml)
        .with_context(|| format!("failed to load OpenAPI document {}", file_path.display()))
}

/// Parse document text that is already in memory.
pub fn parse_document(content: &str, is_yaml: bool) -> anyhow::Result<OpenApiDocument> {
    let value: serde_json::Value = if is_yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };
    build_document(value)
}
