//! Content negotiation against the `Accept` header.

use crate::response::ContentEntry;
use std::cmp::Ordering;

/// Turns a raw `Accept` header into media types, most preferred first.
///
/// The dispatcher takes one of these so callers can swap in their own parsing.
pub type AcceptParser = fn(Option<&str>) -> Vec<String>;

/// Parse an `Accept` header into a quality-ordered list of media types.
///
/// Entries keep header order among equal `q` values. Entries with `q=0` are
/// dropped. A missing or blank header means `*/*`.
#[must_use]
pub fn parse_accept(header: Option<&str>) -> Vec<String> {
    let Some(header) = header.map(str::trim).filter(|h| !h.is_empty()) else {
        return vec!["*/*".to_string()];
    };

    let mut ranked: Vec<(f32, String)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let media_type = pieces.next()?.trim();
            if media_type.is_empty() {
                return None;
            }
            let mut quality = 1.0_f32;
            for param in pieces {
                let param = param.trim();
                if let Some(q) = param.strip_prefix("q=").or_else(|| param.strip_prefix("Q=")) {
                    quality = q.trim().parse().unwrap_or(1.0);
                }
            }
            (quality > 0.0).then(|| (quality, media_type.to_ascii_lowercase()))
        })
        .collect();

    // sort_by is stable, so equal qualities keep header order
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked.into_iter().map(|(_, media_type)| media_type).collect()
}

/// Media type without parameters, lowercased.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `application/json` or any `+json` structured syntax type.
#[must_use]
pub fn is_json_media_type(content_type: &str) -> bool {
    let media = essence(content_type);
    media == "application/json" || media.ends_with("+json")
}

fn split_type(media_type: &str) -> (&str, &str) {
    media_type.split_once('/').unwrap_or((media_type, "*"))
}

/// Does `candidate` satisfy the accepted `pattern`?
///
/// True when either side is `*/*`, when types are equal and subtypes are equal or
/// the pattern's subtype is `*`, or when subtypes are equal and the pattern's type
/// is `*` (so `*/json` accepts `application/json`).
#[must_use]
pub fn media_types_match(pattern: &str, candidate: &str) -> bool {
    let pattern = essence(pattern);
    let candidate = essence(candidate);
    if pattern == "*/*" || candidate == "*/*" {
        return true;
    }
    let (p_type, p_sub) = split_type(&pattern);
    let (c_type, c_sub) = split_type(&candidate);
    (p_type == c_type && (p_sub == c_sub || p_sub == "*")) || (p_sub == c_sub && p_type == "*")
}

/// Pick the representation to serve.
///
/// Walks `preferred` in order and returns the first content entry matching the
/// first preferred type that matches anything.
#[must_use]
pub fn select<'a>(preferred: &[String], content: &'a [ContentEntry]) -> Option<&'a ContentEntry> {
    preferred.iter().find_map(|pattern| {
        content
            .iter()
            .find(|entry| media_types_match(pattern, &entry.media_type))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(types: &[&str]) -> Vec<ContentEntry> {
        types
            .iter()
            .map(|t| ContentEntry::new(*t, json!(t)))
            .collect()
    }

    #[test]
    fn test_parse_accept_orders_by_quality() {
        let parsed = parse_accept(Some("text/plain;q=0.5, application/json, text/html;q=0.9"));
        assert_eq!(parsed, vec!["application/json", "text/html", "text/plain"]);
    }

    #[test]
    fn test_parse_accept_keeps_order_on_ties_and_drops_q0() {
        let parsed = parse_accept(Some("b/b, a/a, c/c;q=0"));
        assert_eq!(parsed, vec!["b/b", "a/a"]);
    }

    #[test]
    fn test_parse_accept_missing_means_anything() {
        assert_eq!(parse_accept(None), vec!["*/*"]);
        assert_eq!(parse_accept(Some("  ")), vec!["*/*"]);
    }

    #[test]
    fn test_media_type_predicate() {
        assert!(media_types_match("*/*", "image/png"));
        assert!(media_types_match("text/plain", "*/*"));
        assert!(media_types_match("text/*", "text/html"));
        assert!(media_types_match("*/json", "application/json"));
        assert!(media_types_match("application/json", "application/json; charset=utf-8"));
        assert!(!media_types_match("text/*", "application/json"));
        assert!(!media_types_match("application/xml", "application/json"));
        assert!(!media_types_match("text/html", "text/*"));
    }

    #[test]
    fn test_json_media_types() {
        assert!(is_json_media_type("application/json; charset=utf-8"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(!is_json_media_type("text/plain"));
    }

    #[test]
    fn test_select_uses_first_preference_that_matches() {
        let content = entries(&["text/plain", "application/json"]);
        let preferred = parse_accept(Some("application/xml, application/json, text/plain"));
        assert_eq!(select(&preferred, &content).unwrap().media_type, "application/json");
    }

    #[test]
    fn test_select_wildcard_takes_first_entry() {
        let content = entries(&["text/html", "application/json"]);
        assert_eq!(select(&parse_accept(None), &content).unwrap().media_type, "text/html");
    }

    #[test]
    fn test_select_none_when_nothing_matches() {
        let content = entries(&["application/json"]);
        assert!(select(&parse_accept(Some("text/html")), &content).is_none());
    }

    #[test]
    fn test_reordering_entries_that_pick_the_same_item() {
        let cases: [(&[&str], &str, &str); 3] = [
            (&["text/html", "text/plain"], "text/html, text/*", "text/*, text/html"),
            (&["application/json", "text/plain"], "application/json, */json", "*/json, application/json"),
            (&["text/html", "text/plain"], "text/html, */*", "*/*, text/html"),
        ];
        for (types, a, b) in cases {
            let content = entries(types);
            let first = select(&parse_accept(Some(a)), &content).unwrap();
            let second = select(&parse_accept(Some(b)), &content).unwrap();
            assert_eq!(first, second, "{a} vs {b}");
        }
    }

    #[test]
    fn test_reordering_entries_that_pick_different_items_follows_order() {
        let content = entries(&["text/plain", "text/html"]);
        let html_first = select(&parse_accept(Some("text/html, text/*")), &content).unwrap();
        let wildcard_first = select(&parse_accept(Some("text/*, text/html")), &content).unwrap();
        assert_eq!(html_first.media_type, "text/html");
        assert_eq!(wildcard_first.media_type, "text/plain");
    }

    #[test]
    fn test_any_selects_a_literal_media_type() {
        let content = entries(&["application/xml", "application/json"]);
        let picked = select(&parse_accept(Some("*/*")), &content).unwrap();
        assert_eq!(picked.media_type, "application/xml");
    }
}
