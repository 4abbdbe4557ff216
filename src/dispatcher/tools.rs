use crate::negotiate::media_types_match;
use rand::seq::SliceRandom;

/// Small helpers handed to every handler as `args.tools`.
#[derive(Debug, Clone, Default)]
pub struct Tools {
    accept: Vec<String>,
}

impl Tools {
    /// `accept` is the parsed `Accept` header, most preferred first.
    #[must_use]
    pub fn new(accept: Vec<String>) -> Self {
        Self { accept }
    }

    /// Pick one of `items` uniformly at random.
    #[must_use]
    pub fn one_of<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut rand::thread_rng())
    }

    /// Whether the request's `Accept` header allows `media_type`.
    ///
    /// With no parsed preferences everything is accepted.
    #[must_use]
    pub fn accepts(&self, media_type: &str) -> bool {
        self.accept.is_empty()
            || self
                .accept
                .iter()
                .any(|pattern| media_types_match(pattern, media_type))
    }

    #[must_use]
    pub fn accept(&self) -> &[String] {
        &self.accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiate::parse_accept;

    #[test]
    fn test_one_of() {
        let tools = Tools::default();
        let items = ["a", "b", "c"];
        for _ in 0..10 {
            assert!(items.contains(tools.one_of(&items).unwrap()));
        }
        assert!(tools.one_of::<u8>(&[]).is_none());
    }

    #[test]
    fn test_accepts() {
        let tools = Tools::new(parse_accept(Some("text/*, application/json;q=0")));
        assert!(tools.accepts("text/html"));
        assert!(!tools.accepts("application/json"));
        assert!(Tools::default().accepts("image/png"));
    }
}
