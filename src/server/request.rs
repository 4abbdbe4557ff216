use crate::dispatcher::DispatchRequest;
use crate::ids::RequestId;
use crate::negotiate::is_json_media_type;
use http::Method;
use may_minihttp::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::time::Instant;
use tracing::{debug, warn};

/// Request data extracted from a `may_minihttp::Request`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// JSON when the payload parses as JSON, text otherwise, `None` when empty
    pub body: Option<Value>,
}

impl ParsedRequest {
    /// Convert into a dispatcher request.
    ///
    /// Returns `None` when the method is not a valid HTTP token.
    pub fn into_dispatch_request(self, deadline: Instant) -> Option<DispatchRequest> {
        let method = Method::from_bytes(self.method.as_bytes()).ok()?;
        let request_id = RequestId::from_headers(&self.headers);
        Some(DispatchRequest {
            request_id,
            method,
            path: self.path,
            headers: self.headers,
            query: self.query_params,
            body: self.body,
            deadline: Some(deadline),
        })
    }
}

/// Parse query string parameters from a URL path
///
/// Everything after the first `?` is form-urlencoded decoded. Repeated keys keep
/// the last value.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Decode a request payload.
///
/// A JSON media type, or no `content-type` at all, decodes as JSON when the bytes
/// parse. Anything else, and JSON that does not parse, is (lossy) UTF-8 text.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    if content_type.map_or(true, is_json_media_type) {
        if let Ok(json) = serde_json::from_slice(bytes) {
            return Some(json);
        }
    }
    Some(Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Parse an incoming HTTP request into a [`ParsedRequest`].
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let query_params = parse_query_params(&raw_path);

    let mut bytes = Vec::new();
    if let Err(e) = req.body().read_to_end(&mut bytes) {
        warn!(method = %method, path = %path, error = %e, "Failed to read request body");
        bytes.clear();
    }
    let body = decode_body(headers.get("content-type").map(String::as_str), &bytes);

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_count = query_params.len(),
        body_bytes = bytes.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}
