use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Where a declared parameter travels in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// OpenAPI v2 form field
    FormData,
    /// OpenAPI v2 request body parameter
    Body,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "formData" => Some(Self::FormData),
            "body" => Some(Self::Body),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "Path"),
            ParameterLocation::Query => write!(f, "Query"),
            ParameterLocation::Header => write!(f, "Header"),
            ParameterLocation::Cookie => write!(f, "Cookie"),
            ParameterLocation::FormData => write!(f, "FormData"),
            ParameterLocation::Body => write!(f, "Body"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Primitive type as declared (`schema.type` in v3, `type` in v2)
    pub declared_type: Option<String>,
    pub schema: Option<Value>,
}

/// Declared primitive types per parameter name, split by location.
///
/// `integer` is folded into `number` so both coerce the same way. Header names are
/// lowercased to line up with the lowercased request headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTypes {
    pub path: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub header: HashMap<String, String>,
}

impl ParameterTypes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty() && self.header.is_empty()
    }
}

/// One `(path, method)` pair of an OpenAPI document, read-only after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: Method,
    /// Path key exactly as written in the document
    pub path: String,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterMeta>,
    /// Status code (or `default`) to response object, `$ref`s already expanded
    pub responses: Map<String, Value>,
    /// v2 `produces`, already merged with the document-level list
    pub produces: Vec<String>,
}

impl Operation {
    /// Response object for `status`, falling back to `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&Value> {
        self.responses
            .get(&status.to_string())
            .or_else(|| self.responses.get("default"))
    }

    /// Lowest declared 2xx status, or 200 when none is declared.
    #[must_use]
    pub fn success_status(&self) -> u16 {
        self.responses
            .keys()
            .filter_map(|k| k.parse::<u16>().ok())
            .filter(|s| (200..300).contains(s))
            .min()
            .unwrap_or(200)
    }

    #[must_use]
    pub fn parameter_types(&self) -> ParameterTypes {
        let mut types = ParameterTypes::default();
        for param in &self.parameters {
            let Some(declared) = param.declared_type.as_deref() else {
                continue;
            };
            let declared = if declared == "integer" {
                "number".to_string()
            } else {
                declared.to_string()
            };
            match param.location {
                ParameterLocation::Path => {
                    types.path.insert(param.name.clone(), declared);
                }
                ParameterLocation::Query => {
                    types.query.insert(param.name.clone(), declared);
                }
                ParameterLocation::Header => {
                    types.header.insert(param.name.to_ascii_lowercase(), declared);
                }
                _ => {}
            }
        }
        types
    }
}

/// A loaded OpenAPI document (v2 or v3) reduced to what dispatch needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenApiDocument {
    /// v2 `basePath`, stripped from request paths before routing
    pub base_path: Option<String>,
    /// v2 document-level `produces`
    pub produces: Vec<String>,
    /// Path keys in document order
    pub paths: Vec<String>,
    pub(crate) operations: HashMap<(String, Method), Arc<Operation>>,
}

impl OpenApiDocument {
    /// Find the operation for a matched template, comparing paths case-insensitively.
    #[must_use]
    pub fn operation(&self, template: &str, method: &Method) -> Option<Arc<Operation>> {
        self.operations
            .get(&(template.to_lowercase(), method.clone()))
            .map(Arc::clone)
    }

    /// Every operation, grouped by path in document order.
    #[must_use]
    pub fn operations_by_path(&self) -> Vec<(String, Vec<Arc<Operation>>)> {
        self.paths
            .iter()
            .map(|path| {
                let key = path.to_lowercase();
                let mut ops: Vec<Arc<Operation>> = self
                    .operations
                    .iter()
                    .filter(|((p, _), _)| *p == key)
                    .map(|(_, op)| Arc::clone(op))
                    .collect();
                ops.sort_by(|a, b| a.method.as_str().cmp(b.method.as_str()));
                (path.clone(), ops)
            })
            .collect()
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Strip `basePath` from the front of `path` (case-insensitive).
    ///
    /// Only strips on a segment boundary; `/api` is not stripped from `/apiary`.
    /// Stripping the whole path yields `/`.
    #[must_use]
    pub fn strip_base_path<'a>(&self, path: &'a str) -> &'a str {
        let Some(base) = self
            .base_path
            .as_deref()
            .map(|b| b.trim_end_matches('/'))
            .filter(|b| !b.is_empty())
        else {
            return path;
        };
        if path.len() < base.len()
            || !path.is_char_boundary(base.len())
            || !path[..base.len()].eq_ignore_ascii_case(base)
        {
            return path;
        }
        match &path[base.len()..] {
            "" => "/",
            rest if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}
