use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Correlation id for one dispatched request, a ULID.
///
/// Clients may supply their own in `x-request-id`; anything that is not a ULID is
/// replaced by a fresh one.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Take the id from lowercased request headers, or mint one.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        headers
            .get("x-request-id")
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self)
    }
}
