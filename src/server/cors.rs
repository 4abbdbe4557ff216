use crate::config::CorsConfig;
use http::Method;

/// CORS headers added to every response, and the answer to preflight `OPTIONS`.
///
/// The lines are built once per policy and leaked, since the transport only
/// accepts `&'static str` header lines.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    lines: Vec<&'static str>,
}

impl Default for CorsPolicy {
    /// Allow any origin, the usual request headers and every method a mock serves.
    fn default() -> Self {
        Self::from_config(&CorsConfig::default())
    }
}

impl CorsPolicy {
    pub fn new(allowed_origin: &str, allowed_headers: &[String], allowed_methods: &[Method]) -> Self {
        let methods = allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let headers = if allowed_headers.is_empty() {
            "*".to_string()
        } else {
            allowed_headers.join(", ")
        };
        let lines = [
            format!("Access-Control-Allow-Origin: {allowed_origin}"),
            format!("Access-Control-Allow-Methods: {methods}"),
            format!("Access-Control-Allow-Headers: {headers}"),
        ]
        .into_iter()
        .map(|line| &*Box::leak(line.into_boxed_str()))
        .collect();
        Self { lines }
    }

    /// Policy from configuration; a disabled policy adds nothing.
    pub fn from_config(config: &CorsConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self::new(
            &config.allow_origin,
            &config.allow_headers,
            &[
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::HEAD,
                Method::OPTIONS,
            ],
        )
    }

    pub fn disabled() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn header_lines(&self) -> &[&'static str] {
        &self.lines
    }
}
