use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage shared by descriptors and resolved responses.
///
/// Header names use `Arc<str>` because the same few names (`content-type`,
/// `location`, ...) are repeated across every response a handler builds.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// One candidate representation of a response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEntry {
    /// Media type this representation is served as (e.g. `application/json`)
    pub media_type: String,
    /// The body for this media type
    pub body: Value,
}

impl ContentEntry {
    pub fn new(media_type: impl Into<String>, body: impl Into<Value>) -> Self {
        Self {
            media_type: media_type.into(),
            body: body.into(),
        }
    }
}

/// What a handler hands back to the dispatcher.
///
/// A descriptor carrying `content` is *unresolved*: the dispatcher negotiates one
/// entry against the `Accept` header. Without `content` it is passed through as
/// is, with `content_type` falling back to a `content-type` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseDescriptor {
    /// HTTP status, 200 when absent
    pub status: Option<u16>,
    pub headers: HeaderVec,
    /// Candidate representations awaiting content negotiation
    pub content: Option<Vec<ContentEntry>>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

impl ResponseDescriptor {
    /// A resolved `text/plain` response.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            content_type: Some("text/plain".to_string()),
            body: Some(Value::String(body.into())),
            ..Self::default()
        }
    }

    /// True once no content list is left to negotiate.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.content.is_none()
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    pub fn push_content(&mut self, media_type: impl Into<String>, body: impl Into<Value>) {
        self.content
            .get_or_insert_with(Vec::new)
            .push(ContentEntry::new(media_type, body));
    }
}

impl From<String> for ResponseDescriptor {
    fn from(body: String) -> Self {
        Self::text(200, body)
    }
}

impl From<&str> for ResponseDescriptor {
    fn from(body: &str) -> Self {
        Self::text(200, body)
    }
}

/// The final `{status, headers, contentType, body}` tuple handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

impl ResolvedResponse {
    /// A `text/plain` response with no extra headers.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            content_type: Some("text/plain".to_string()),
            body: Some(Value::String(body.into())),
        }
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as a string when it is textual.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_ref().and_then(Value::as_str)
    }

    /// Serialize the body for the wire.
    ///
    /// Strings are written verbatim, `null` and a missing body are empty, and any
    /// other JSON value is serialized.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => s.clone().into_bytes(),
            Some(other) => serde_json::to_vec(other).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_shorthand_is_plain_text_200() {
        let d = ResponseDescriptor::from("hi");
        assert_eq!(d.status, Some(200));
        assert_eq!(d.content_type.as_deref(), Some("text/plain"));
        assert_eq!(d.body, Some(json!("hi")));
        assert!(d.is_resolved());
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut d = ResponseDescriptor::default();
        d.set_header("Content-Type", "text/html");
        d.set_header("content-type", "application/json");
        assert_eq!(d.headers.len(), 1);
        assert_eq!(d.get_header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_body_bytes() {
        let mut r = ResolvedResponse::text(200, "plain");
        assert_eq!(r.body_bytes(), b"plain".to_vec());
        r.body = Some(json!({"a": 1}));
        assert_eq!(r.body_bytes(), br#"{"a":1}"#.to_vec());
        r.body = None;
        assert!(r.body_bytes().is_empty());
    }
}
