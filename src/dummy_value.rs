//! Schema-driven fabrication of plausible values.
//!
//! Walks a JSON Schema (as found in an OpenAPI document) and produces a random
//! value that fits it closely enough for a mock response: objects get their
//! properties, arrays get a handful of items, and primitives get a type-appropriate
//! scalar. `const`, `examples`, `example` and `enum` are preferred over invention.
//! This is not a validator; keywords that do not shape a value are ignored.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use serde_json::{Map, Number, Value};

/// Nested objects and arrays deeper than this are fabricated empty.
const MAX_DEPTH: usize = 8;
const DEFAULT_MAX_ITEMS: u64 = 3;
const DEFAULT_INTEGER_SPAN: i64 = 1000;

const WORDS: [&str; 16] = [
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed",
    "do", "eiusmod", "tempor", "incididunt", "labore", "magna", "aliqua",
];

/// Fabricate a random value that matches `schema`.
///
/// Anything that is not a schema object (including the boolean schema `true`)
/// fabricates `null`.
pub fn fabricate<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Value {
    fabricate_at(schema, rng, 0)
}

fn fabricate_at<R: Rng + ?Sized>(schema: &Value, rng: &mut R, depth: usize) -> Value {
    let Some(obj) = schema.as_object() else {
        return Value::Null;
    };

    if let Some(value) = obj.get("const") {
        return value.clone();
    }
    if let Some(value) = obj
        .get("examples")
        .and_then(Value::as_array)
        .and_then(|examples| examples.choose(rng))
    {
        return value.clone();
    }
    if let Some(value) = obj.get("example") {
        return value.clone();
    }
    if let Some(value) = obj
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.choose(rng))
    {
        return value.clone();
    }

    if let Some(all) = obj.get("allOf").and_then(Value::as_array) {
        return fabricate_all_of(all, rng, depth);
    }
    if let Some(pick) = ["oneOf", "anyOf"]
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_array))
        .find_map(|options| options.choose(rng))
    {
        return fabricate_at(pick, rng, depth);
    }

    match schema_type(obj, rng) {
        Some("object") => fabricate_object(obj, rng, depth),
        Some("array") => fabricate_array(obj, rng, depth),
        Some("string") => Value::String(fabricate_string(obj, rng)),
        Some("integer") => Value::from(fabricate_integer(obj, rng)),
        Some("number") => fabricate_number(obj, rng),
        Some("boolean") => Value::Bool(rng.gen()),
        _ => Value::Null,
    }
}

/// The type to fabricate: `type` as a string, a random non-null entry when it is a
/// list, else inferred from `properties`/`items`.
fn schema_type<'a, R: Rng + ?Sized>(obj: &'a Map<String, Value>, rng: &mut R) -> Option<&'a str> {
    match obj.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .filter(|t| *t != "null")
            .choose(rng),
        _ if obj.contains_key("properties") => Some("object"),
        _ if obj.contains_key("items") => Some("array"),
        _ => None,
    }
}

fn fabricate_all_of<R: Rng + ?Sized>(parts: &[Value], rng: &mut R, depth: usize) -> Value {
    let mut merged = Map::new();
    let mut last = Value::Null;
    for part in parts {
        match fabricate_at(part, rng, depth) {
            Value::Object(fields) => merged.extend(fields),
            other => last = other,
        }
    }
    if merged.is_empty() {
        last
    } else {
        Value::Object(merged)
    }
}

fn fabricate_object<R: Rng + ?Sized>(obj: &Map<String, Value>, rng: &mut R, depth: usize) -> Value {
    let mut out = Map::new();
    if depth >= MAX_DEPTH {
        return Value::Object(out);
    }
    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
        for (name, prop) in properties {
            // optional properties show up about half the time
            if required.contains(&name.as_str()) || rng.gen_bool(0.5) {
                out.insert(name.clone(), fabricate_at(prop, rng, depth + 1));
            }
        }
    }
    Value::Object(out)
}

fn fabricate_array<R: Rng + ?Sized>(obj: &Map<String, Value>, rng: &mut R, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::Array(Vec::new());
    }
    match obj.get("items") {
        // tuple form
        Some(Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| fabricate_at(item, rng, depth + 1))
                .collect(),
        ),
        Some(item) => {
            let max_items = obj.get("maxItems").and_then(Value::as_u64);
            let min = obj
                .get("minItems")
                .and_then(Value::as_u64)
                .unwrap_or_else(|| max_items.map_or(1, |m| m.min(1)));
            let max = max_items
                .unwrap_or_else(|| min.max(DEFAULT_MAX_ITEMS))
                .max(min);
            let count = rng.gen_range(min..=max);
            Value::Array(
                (0..count)
                    .map(|_| fabricate_at(item, rng, depth + 1))
                    .collect(),
            )
        }
        None => Value::Array(Vec::new()),
    }
}

fn fabricate_string<R: Rng + ?Sized>(obj: &Map<String, Value>, rng: &mut R) -> String {
    match obj.get("format").and_then(Value::as_str) {
        Some("date-time") => {
            let date = random_date(rng);
            let (h, m, s) = (rng.gen_range(0..24), rng.gen_range(0..60), rng.gen_range(0..60));
            format!("{date}T{h:02}:{m:02}:{s:02}Z")
        }
        Some("date") => random_date(rng),
        Some("email") => format!("{}{}@example.com", random_word(rng), rng.gen_range(1..1000)),
        Some("uuid") => random_uuid(rng),
        Some("uri") | Some("url") => format!("https://example.com/{}", random_word(rng)),
        Some("hostname") => format!("{}.example.com", random_word(rng)),
        Some("ipv4") => {
            let octets: [u8; 4] = rng.gen();
            format!("10.{}.{}.{}", octets[1], octets[2], octets[3].max(1))
        }
        Some("byte") => "bG9yZW0gaXBzdW0=".to_string(),
        _ => lorem(obj, rng),
    }
}

fn lorem<R: Rng + ?Sized>(obj: &Map<String, Value>, rng: &mut R) -> String {
    let min = obj.get("minLength").and_then(Value::as_u64).unwrap_or(0) as usize;
    let max = obj
        .get("maxLength")
        .and_then(Value::as_u64)
        .map(|m| (m as usize).max(min));

    let word_count = rng.gen_range(1..=4);
    let mut text = (0..word_count)
        .map(|_| random_word(rng))
        .collect::<Vec<_>>()
        .join(" ");
    while text.len() < min {
        text.push(' ');
        text.push_str(random_word(rng));
    }
    if let Some(max) = max {
        text.truncate(max);
        let trimmed = text.trim_end().len();
        if trimmed >= min {
            text.truncate(trimmed);
        }
    }
    text
}

fn fabricate_integer<R: Rng + ?Sized>(obj: &Map<String, Value>, rng: &mut R) -> i64 {
    let lower = obj
        .get("minimum")
        .and_then(Value::as_i64)
        .or_else(|| obj.get("exclusiveMinimum").and_then(Value::as_i64).map(|m| m.saturating_add(1)));
    let upper = obj
        .get("maximum")
        .and_then(Value::as_i64)
        .or_else(|| obj.get("exclusiveMaximum").and_then(Value::as_i64).map(|m| m.saturating_sub(1)));
    let (lo, hi) = match (lower, upper) {
        (Some(lo), Some(hi)) => (lo, hi.max(lo)),
        (Some(lo), None) => (lo, lo.saturating_add(DEFAULT_INTEGER_SPAN)),
        (None, Some(hi)) => (hi.saturating_sub(DEFAULT_INTEGER_SPAN), hi),
        (None, None) => (0, DEFAULT_INTEGER_SPAN),
    };
    rng.gen_range(lo..=hi)
}

fn fabricate_number<R: Rng + ?Sized>(obj: &Map<String, Value>, rng: &mut R) -> Value {
    let lo = obj.get("minimum").and_then(Value::as_f64).unwrap_or(0.0);
    let hi = obj
        .get("maximum")
        .and_then(Value::as_f64)
        .unwrap_or(lo + DEFAULT_INTEGER_SPAN as f64)
        .max(lo);
    let raw = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    let rounded = ((raw * 100.0).round() / 100.0).clamp(lo, hi);
    Number::from_f64(rounded).map_or(Value::Null, Value::Number)
}

fn random_word<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    WORDS.choose(rng).copied().unwrap_or("lorem")
}

fn random_date<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}-{:02}-{:02}",
        rng.gen_range(2000..=2030),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28)
    )
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes: [u8; 16] = rng.gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
