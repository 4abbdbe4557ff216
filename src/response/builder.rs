use super::descriptor::{ContentEntry, ResponseDescriptor};
use crate::dummy_value::fabricate;
use crate::spec::Operation;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Per-request entry point for building responses for one operation.
///
/// Handed to handlers as `args.response`. Without an operation (no document, or
/// the route is not described by it) the builder still works; only `random()`
/// needs the operation.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    operation: Option<Arc<Operation>>,
}

impl ResponseBuilder {
    #[must_use]
    pub fn new(operation: Option<Arc<Operation>>) -> Self {
        Self { operation }
    }

    #[must_use]
    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_deref()
    }

    /// Start a response with the given status.
    #[must_use]
    pub fn for_status(&self, status: u16) -> StatusResponse {
        StatusResponse {
            operation: self.operation.clone(),
            descriptor: ResponseDescriptor {
                status: Some(status),
                ..ResponseDescriptor::default()
            },
        }
    }

    /// Shorthand for `for_status(200)`
    #[must_use]
    pub fn ok(&self) -> StatusResponse {
        self.for_status(200)
    }
}

/// A response under construction for a fixed status.
///
/// Every method returns a new value and leaves `self` untouched, so a partially
/// built response can be shared as a template.
#[derive(Debug, Clone)]
pub struct StatusResponse {
    operation: Option<Arc<Operation>>,
    descriptor: ResponseDescriptor,
}

impl StatusResponse {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.descriptor.status.unwrap_or(200)
    }

    #[must_use]
    pub fn descriptor(&self) -> &ResponseDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn into_descriptor(self) -> ResponseDescriptor {
        self.descriptor
    }

    #[must_use]
    pub fn header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.descriptor.set_header(name, value);
        next
    }

    /// Offer `body` as the representation for `media_type`.
    #[must_use]
    pub fn content(&self, media_type: &str, body: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.descriptor.push_content(media_type, body);
        next
    }

    #[must_use]
    pub fn text(&self, body: impl Into<String>) -> Self {
        self.content("text/plain", Value::String(body.into()))
    }

    #[must_use]
    pub fn html(&self, body: impl Into<String>) -> Self {
        self.content("text/html", Value::String(body.into()))
    }

    #[must_use]
    pub fn json(&self, body: impl Into<Value>) -> Self {
        self.content("application/json", body)
    }

    /// Fill the response from the operation's declared response for this status.
    ///
    /// Falls back to the `default` response. When neither is declared the result is
    /// a 500 explaining which status code the document is missing. Named examples
    /// are picked uniformly at random; otherwise the schema is fabricated. Declared
    /// response headers with a schema get fabricated values unless already set.
    #[must_use]
    pub fn random(&self) -> Self {
        let status = self.status();
        let Some(operation) = self.operation.as_deref() else {
            return self.undeclared(status);
        };
        let Some(response) = operation.response_for(status) else {
            return self.undeclared(status);
        };

        let mut rng = rand::thread_rng();
        let mut next = self.clone();

        if response.get("content").is_none() && !operation.produces.is_empty() {
            let body = legacy_body(response, &mut rng);
            for media_type in &operation.produces {
                next.descriptor.push_content(media_type.clone(), body.clone());
            }
        } else if let Some(content) = response.get("content").and_then(Value::as_object) {
            for (media_type, media) in content {
                let body = media_body(media, &mut rng);
                next.descriptor.push_content(media_type.clone(), body);
            }
        }

        if let Some(headers) = response.get("headers").and_then(Value::as_object) {
            for (name, header) in headers {
                if next.descriptor.get_header(name).is_some() {
                    continue;
                }
                // v2 puts the type on the header object itself
                let schema = header.get("schema").unwrap_or(header);
                let value = fabricate(schema, &mut rng);
                if !value.is_null() {
                    next.descriptor.set_header(name, header_text(&value));
                }
            }
        }

        debug!(
            status,
            operation = %operation.path,
            method = %operation.method,
            representations = next.descriptor.content.as_ref().map_or(0, Vec::len),
            "Fabricated random response"
        );
        next
    }

    fn undeclared(&self, status: u16) -> Self {
        Self {
            operation: self.operation.clone(),
            descriptor: ResponseDescriptor {
                status: Some(500),
                content: Some(vec![ContentEntry::new(
                    "text/plain",
                    format!(
                        "The Open API document does not specify a response for status code {status}"
                    ),
                )]),
                ..ResponseDescriptor::default()
            },
        }
    }
}

impl From<StatusResponse> for ResponseDescriptor {
    fn from(response: StatusResponse) -> Self {
        response.descriptor
    }
}

/// Body for one v3 media type object: named example, then `example`, then schema.
fn media_body<R: Rng + ?Sized>(media: &Value, rng: &mut R) -> Value {
    if let Some(example) = media
        .get("examples")
        .and_then(Value::as_object)
        .and_then(|examples| examples.values().choose(rng))
    {
        return example.get("value").cloned().unwrap_or_else(|| example.clone());
    }
    if let Some(example) = media.get("example") {
        return example.clone();
    }
    media
        .get("schema")
        .map_or(Value::Null, |schema| fabricate(schema, rng))
}

/// Body for a v2 response: one of `examples` (keyed by media type), else the schema.
fn legacy_body<R: Rng + ?Sized>(response: &Value, rng: &mut R) -> Value {
    if let Some(example) = response
        .get("examples")
        .and_then(Value::as_object)
        .and_then(|examples| examples.values().choose(rng))
    {
        return example.clone();
    }
    response
        .get("schema")
        .map_or(Value::Null, |schema| fabricate(schema, rng))
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
