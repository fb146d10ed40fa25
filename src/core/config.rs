//! Purpose: Explicit client configuration (credential, universe, endpoint, cache policy).
//! Exports: `ClientConfig`, `DEFAULT_BASE_URL`, `DEFAULT_CACHE_INTERVAL`.
//! Role: Plain value owned by the dispatcher; changed only through `&mut` setters.
//! Invariants: `base_url` is http(s) and normalized to the root path without query.
use super::error::{ApiResult, Error, ErrorKind};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://apis.roblox.com/";
pub const DEFAULT_CACHE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub universe_id: u64,
    pub base_url: Url,
    /// Consult and update the entry cache for single-entry datastore calls.
    pub use_cache: bool,
    /// Freshness window given to cached entries.
    pub cache_interval: Duration,
    /// Maximum number of cached entries; `None` keeps the cache unbounded.
    pub cache_capacity: Option<usize>,
}

impl ClientConfig {
    pub fn new(universe_id: u64, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            universe_id,
            base_url: default_base_url(),
            use_cache: true,
            cache_interval: DEFAULT_CACHE_INTERVAL,
            cache_capacity: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> ApiResult<Self> {
        self.base_url = normalize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_cache_interval(mut self, interval: Duration) -> Self {
        self.cache_interval = interval;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base url")
}

pub(crate) fn normalize_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Validation)
            .with_message("invalid base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::validation("base url must use http or https scheme"));
    }
    if url.cannot_be_a_base() {
        return Err(Error::validation("base url cannot be a base"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::validation("base url must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
