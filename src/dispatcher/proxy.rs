use crate::negotiate::is_json_media_type;
use crate::response::{HeaderVec, ResponseDescriptor};
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Request headers that describe the inbound hop and are not forwarded.
const HOP_HEADERS: [&str; 6] = [
    "host",
    "content-length",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
];

/// Default upper bound on a proxied call when no deadline applies.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum ProxyError {
    /// The request body is neither JSON nor absent
    Unsupported { content_type: String },
    InvalidUrl { url: String },
    /// The inbound request's deadline passed before the call could start
    DeadlineExceeded { url: String },
    Upstream { url: String, source: reqwest::Error },
    ClientBuild(reqwest::Error),
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::Unsupported { content_type } => write!(
                f,
                "cannot proxy a request with a '{content_type}' body; only JSON bodies are supported"
            ),
            ProxyError::InvalidUrl { url } => write!(f, "invalid proxy URL '{url}'"),
            ProxyError::DeadlineExceeded { url } => {
                write!(f, "request deadline passed before proxying to {url}")
            }
            ProxyError::Upstream { url, source } => write!(f, "proxy call to {url} failed: {source}"),
            ProxyError::ClientBuild(e) => write!(f, "failed to build proxy client: {e}"),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Upstream { source, .. } => Some(source),
            ProxyError::ClientBuild(e) => Some(e),
            _ => None,
        }
    }
}

/// Forwards the current request to another server.
///
/// Handed to handlers as `args.proxy`; carries the inbound method, headers, body and
/// path so that `forward(url)` re-issues the same request against `url + path`.
#[derive(Clone, Default)]
pub struct Proxy {
    client: Option<reqwest::blocking::Client>,
    method: Method,
    headers: Arc<HashMap<String, String>>,
    body: Option<Value>,
    path: String,
    deadline: Option<Instant>,
    /// Upper bound for a single call, whatever the deadline leaves
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Proxy {
    /// `path` is appended to the target URL; include the query string if it should
    /// be forwarded.
    #[must_use]
    pub fn new(
        client: Option<reqwest::blocking::Client>,
        method: Method,
        headers: Arc<HashMap<String, String>>,
        body: Option<Value>,
        path: impl Into<String>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            client,
            method,
            headers,
            body,
            path: path.into(),
            deadline,
            timeout: None,
        }
    }

    /// Cap each call at `timeout` instead of [`DEFAULT_PROXY_TIMEOUT`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send the request to `url + path` and return the upstream answer as a
    /// resolved response.
    ///
    /// The call is bounded by what is left of the inbound request's deadline. JSON
    /// upstream bodies are parsed; anything else is returned as text.
    pub fn forward(&self, url: &str) -> Result<ResponseDescriptor, ProxyError> {
        let content_type = self.headers.get("content-type").map(String::as_str);
        if self.body.is_some() {
            let content_type = content_type.unwrap_or("application/octet-stream");
            if !is_json_media_type(content_type) {
                return Err(ProxyError::Unsupported {
                    content_type: content_type.to_string(),
                });
            }
        }

        let target = format!("{}{}", url.trim_end_matches('/'), self.path);
        let target_url = url::Url::parse(&target).map_err(|_| ProxyError::InvalidUrl {
            url: target.clone(),
        })?;

        let cap = self.timeout.unwrap_or(DEFAULT_PROXY_TIMEOUT);
        let timeout = match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(ProxyError::DeadlineExceeded { url: target });
                }
                remaining.min(cap)
            }
            None => cap,
        };

        let client = match &self.client {
            Some(client) => client.clone(),
            None => reqwest::blocking::Client::builder()
                .build()
                .map_err(ProxyError::ClientBuild)?,
        };

        let mut request = client
            .request(self.method.clone(), target_url)
            .timeout(timeout);
        for (name, value) in self.headers.iter() {
            if HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &self.body {
            request = request.json(body);
        }

        debug!(method = %self.method, target = %target, timeout_ms = timeout.as_millis() as u64, "Proxying request");
        let response = request.send().map_err(|source| {
            warn!(target = %target, error = %source, "Proxy call failed");
            ProxyError::Upstream {
                url: target.clone(),
                source,
            }
        })?;

        let status = response.status().as_u16();
        let mut headers = HeaderVec::new();
        for (name, value) in response.headers() {
            if HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                headers.push((Arc::from(name.as_str()), value.to_string()));
            }
        }
        let upstream_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().map_err(|source| ProxyError::Upstream {
            url: target.clone(),
            source,
        })?;
        let body = match upstream_type.as_deref() {
            Some(ct) if is_json_media_type(ct) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            _ => Value::String(text),
        };

        Ok(ResponseDescriptor {
            status: Some(status),
            headers,
            content: None,
            content_type: upstream_type,
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proxy_with(content_type: Option<&str>, body: Option<Value>) -> Proxy {
        let mut headers = HashMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type".to_string(), ct.to_string());
        }
        Proxy::new(None, Method::POST, Arc::new(headers), body, "/x", None)
    }

    #[test]
    fn test_non_json_body_is_unsupported() {
        let err = proxy_with(Some("text/plain"), Some(json!("hi")))
            .forward("http://127.0.0.1:9")
            .unwrap_err();
        assert!(matches!(err, ProxyError::Unsupported { .. }));
    }

    #[test]
    fn test_body_without_content_type_is_unsupported() {
        let err = proxy_with(None, Some(json!({"a": 1})))
            .forward("http://127.0.0.1:9")
            .unwrap_err();
        assert!(matches!(err, ProxyError::Unsupported { .. }));
    }

    #[test]
    fn test_expired_deadline() {
        let mut proxy = proxy_with(None, None);
        proxy.deadline = Some(Instant::now());
        let err = proxy.forward("http://127.0.0.1:9").unwrap_err();
        assert!(matches!(err, ProxyError::DeadlineExceeded { .. }));
    }

    #[test]
    fn test_invalid_url() {
        let err = proxy_with(None, None).forward("not a url").unwrap_err();
        assert!(matches!(err, ProxyError::InvalidUrl { .. }));
    }
}
