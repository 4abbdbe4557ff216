use base64::Engine;

/// Credentials from an `Authorization: Basic ...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Parse a Basic `Authorization` header value.
///
/// Returns `None` for other schemes and for values that are not valid base64 of
/// UTF-8 text. A value with no `:` is all username.
#[must_use]
pub fn parse_basic_auth(header: Option<&str>) -> Option<BasicAuth> {
    let header = header?.trim();
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':').unwrap_or((decoded.as_str(), ""));
    Some(BasicAuth {
        username: username.to_string(),
        password: password.to_string(),
    })
}
