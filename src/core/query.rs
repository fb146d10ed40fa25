//! Purpose: Build and read percent-encoded query strings.
//! Exports: `QueryParams`, `query_value`.
//! Role: Shared by façades (building URLs) and the dispatcher (deriving cache keys).
//! Invariants: Absent parameters are omitted entirely, never emitted as empty pairs.
//! Invariants: Pair order is insertion order; existing query pairs on the URL are kept.
use url::Url;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn push_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn apply_to(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            return;
        }
        let mut query = url.query_pairs_mut();
        for (key, value) in &self.pairs {
            query.append_pair(key, value);
        }
    }

    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        self.apply_to(&mut url);
        url
    }
}

/// First decoded value of `key` in the URL's query string.
pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}
