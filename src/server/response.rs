use crate::response::ResolvedResponse;
use dashmap::DashMap;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Response header lines `may_minihttp` holds per response.
const RESPONSE_HEADER_SLOTS: usize = 16;

/// Distinct header lines cached by the global [`LineTable`].
const MAX_INTERNED_LINES: usize = 16_384;

/// `may_minihttp` takes `&'static str` header lines, so every line is leaked.
///
/// A line is leaked once and reused while the table has room. Lines first seen
/// after the table is full are leaked for each response that carries them.
/// Either way the caller always gets its line back.
pub struct LineTable {
    lines: DashMap<String, &'static str>,
    capacity: usize,
    full: AtomicBool,
}

impl LineTable {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: DashMap::new(),
            capacity,
            full: AtomicBool::new(false),
        }
    }

    /// `Name: value` as a static line.
    pub fn line(&self, name: &str, value: &str) -> &'static str {
        self.intern(format!("{name}: {value}"))
    }

    fn intern(&self, line: String) -> &'static str {
        if let Some(existing) = self.lines.get(&line) {
            return *existing;
        }
        if self.lines.len() >= self.capacity {
            if !self.full.swap(true, Ordering::Relaxed) {
                warn!(
                    capacity = self.capacity,
                    "Header line table full, new distinct lines are no longer cached"
                );
            }
            return Box::leak(line.into_boxed_str());
        }
        let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
        *self.lines.entry(line).or_insert(leaked)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

static HEADER_LINES: Lazy<LineTable> = Lazy::new(|| LineTable::with_capacity(MAX_INTERNED_LINES));

pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Header lines for a resolved response, in write order.
///
/// `Content-Type` comes first, then the response's own headers, then `extra`
/// (CORS). `Content-Type` and `Content-Length` entries among the response headers
/// are skipped; the transport writes those itself. When there are more lines than
/// the transport has slots, the surplus is folded into the last slot as one
/// CRLF-joined line, so no header is lost.
pub fn header_lines(resolved: &ResolvedResponse, extra: &[&'static str]) -> Vec<&'static str> {
    header_lines_in(&HEADER_LINES, resolved, extra)
}

fn header_lines_in(
    table: &LineTable,
    resolved: &ResolvedResponse,
    extra: &[&'static str],
) -> Vec<&'static str> {
    // may_minihttp adds Server and Date on its own
    let capacity = RESPONSE_HEADER_SLOTS - 2;
    let mut lines = Vec::with_capacity(capacity);

    let has_body = resolved.body.as_ref().is_some_and(|b| !b.is_null());
    let content_type = resolved.content_type.clone().or_else(|| {
        has_body.then(|| match resolved.body {
            Some(serde_json::Value::String(_)) => "text/plain".to_string(),
            _ => "application/json".to_string(),
        })
    });
    if let Some(ct) = content_type {
        lines.push(table.line("Content-Type", &ct));
    }

    lines.extend(
        resolved
            .headers
            .iter()
            .filter(|(name, _)| {
                !name.eq_ignore_ascii_case("content-type")
                    && !name.eq_ignore_ascii_case("content-length")
            })
            .map(|(name, value)| table.line(name, value)),
    );
    lines.extend(extra.iter().copied());

    if lines.len() > capacity {
        let folded = lines.split_off(capacity - 1);
        debug!(
            status = resolved.status,
            folded = folded.len(),
            "Folding surplus headers into one transport slot"
        );
        lines.push(table.intern(folded.join("\r\n")));
    }
    lines
}

/// Write a resolved response to the wire.
pub fn write_resolved(res: &mut Response, resolved: &ResolvedResponse, extra: &[&'static str]) {
    res.status_code(resolved.status as usize, status_reason(resolved.status));
    for line in header_lines(resolved, extra) {
        res.header(line);
    }
    res.body_vec(resolved.body_bytes());
}

/// Write an empty-bodied status response with the given header lines.
pub fn write_empty(res: &mut Response, status: u16, extra: &[&'static str]) {
    res.status_code(status as usize, status_reason(status));
    for line in extra {
        res.header(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::HeaderVec;
    use serde_json::json;
    use std::sync::Arc;

    fn resolved(headers: &[(&str, &str)]) -> ResolvedResponse {
        let mut h = HeaderVec::new();
        for (k, v) in headers {
            h.push((Arc::from(*k), (*v).to_string()));
        }
        ResolvedResponse {
            status: 200,
            headers: h,
            content_type: None,
            body: Some(json!({"ok": true})),
        }
    }

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(304), "Not Modified");
        assert_eq!(status_reason(406), "Not Acceptable");
        assert_eq!(status_reason(599), "Unknown");
    }

    #[test]
    fn test_interning_reuses_lines() {
        let table = LineTable::with_capacity(8);
        let a = table.line("X-Intern", "same");
        let b = table.line("X-Intern", "same");
        assert_eq!(a, "X-Intern: same");
        assert!(std::ptr::eq(a, b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_full_table_still_returns_lines() {
        let table = LineTable::with_capacity(4);
        for i in 0..10 {
            assert_eq!(table.line("X-Fabricated", &i.to_string()), format!("X-Fabricated: {i}"));
        }
        assert_eq!(table.len(), 4);

        let mut r = resolved(&[("Location", "/pets/123")]);
        r.status = 201;
        r.content_type = Some("application/json".into());
        let lines = header_lines_in(&table, &r, &["Access-Control-Allow-Origin: *"]);
        assert_eq!(
            lines,
            vec![
                "Content-Type: application/json",
                "Location: /pets/123",
                "Access-Control-Allow-Origin: *",
            ]
        );
    }

    #[test]
    fn test_content_type_defaults_from_body() {
        let lines = header_lines(&resolved(&[]), &[]);
        assert_eq!(lines, vec!["Content-Type: application/json"]);

        let mut text = resolved(&[]);
        text.body = Some(json!("hi"));
        assert_eq!(header_lines(&text, &[]), vec!["Content-Type: text/plain"]);

        let mut empty = resolved(&[]);
        empty.body = None;
        assert!(header_lines(&empty, &[]).is_empty());
    }

    #[test]
    fn test_framing_headers_are_skipped() {
        let r = resolved(&[
            ("content-type", "text/html"),
            ("Content-Length", "99"),
            ("X-Rate", "5"),
        ]);
        let lines = header_lines(&r, &["Access-Control-Allow-Origin: *"]);
        assert_eq!(
            lines,
            vec![
                "Content-Type: application/json",
                "X-Rate: 5",
                "Access-Control-Allow-Origin: *",
            ]
        );
    }

    #[test]
    fn test_surplus_headers_are_folded_not_dropped() {
        let table = LineTable::with_capacity(64);
        let names: Vec<String> = (0..30).map(|i| format!("X-H{i}")).collect();
        let pairs: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "v")).collect();
        let lines = header_lines_in(&table, &resolved(&pairs), &["Access-Control-Allow-Origin: *"]);

        assert_eq!(lines.len(), RESPONSE_HEADER_SLOTS - 2);
        assert_eq!(lines[0], "Content-Type: application/json");
        let wire = lines.join("\r\n");
        for name in &names {
            assert!(wire.contains(&format!("{name}: v")), "{name} missing");
        }
        assert!(lines
            .last()
            .unwrap()
            .ends_with("\r\nAccess-Control-Allow-Origin: *"));
    }
}
