//! Purpose: Standard datastore calls (single entries and key listings).
//! Exports: `DataStore`, `EntryAttributes`, `MAX_ENTRY_BYTES`.
//! Role: Thin request builder over the dispatcher; single-entry calls hit the cache.
//! Invariants: Arguments are validated before any request is built.
//! Invariants: Entry URLs always carry `entryKey`, `scope`, and `dataStoreName`.
use super::Universe;
use crate::core::cursor::{PageCursor, PageShape};
use crate::core::dispatch::{Outcome, RequestBody, RequestDescriptor};
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::query::QueryParams;
use crate::core::transport::Method;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use md5::{Digest, Md5};
use serde_json::{Value, json};
use url::Url;

/// Largest JSON-encoded value accepted by `set`.
pub const MAX_ENTRY_BYTES: usize = 4_000_000;

const DEFAULT_SCOPE: &str = "global";
pub(crate) const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryAttributes {
    pub user_ids: Vec<u64>,
    pub metadata: Option<Value>,
}

#[derive(Clone)]
pub struct DataStore<'u> {
    universe: &'u Universe,
    name: String,
    scope: String,
}

impl<'u> DataStore<'u> {
    pub fn new(universe: &'u Universe, name: impl Into<String>) -> Self {
        Self {
            universe,
            name: name.into(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Same universe and scope, different store.
    pub fn data_store(&self, name: impl Into<String>) -> DataStore<'u> {
        DataStore::new(self.universe, name).with_scope(self.scope.clone())
    }

    pub fn get(&self, key: &str) -> ApiResult<Outcome> {
        let url = self.entry_url(key, QueryParams::new())?;
        self.universe.execute(&RequestDescriptor::get(url))
    }

    pub fn set(
        &self,
        key: &str,
        value: &Value,
        attributes: Option<&EntryAttributes>,
    ) -> ApiResult<Outcome> {
        let encoded = serde_json::to_string(value).map_err(|err| {
            Error::new(ErrorKind::Validation)
                .with_message("failed to encode entry value")
                .with_source(err)
        })?;
        if encoded.len() > MAX_ENTRY_BYTES {
            return Err(Error::validation("entry value is larger than 4MB"));
        }
        let checksum = BASE64.encode(Md5::digest(encoded.as_bytes()));
        let user_ids = attributes.map(|attrs| attrs.user_ids.as_slice()).unwrap_or(&[]);
        let metadata = attributes
            .and_then(|attrs| attrs.metadata.as_ref())
            .map(Value::to_string)
            .unwrap_or_default();

        let url = self.entry_url(key, QueryParams::new())?;
        let request = RequestDescriptor::new(Method::Post, url)
            .with_body(RequestBody::Encoded(encoded))
            .with_header("Content-MD5", checksum)
            .with_header("roblox-entry-userids", json!(user_ids).to_string())
            .with_header("roblox-entry-attributes", metadata);
        self.universe.execute(&request)
    }

    pub fn increment(&self, key: &str, amount: f64) -> ApiResult<Outcome> {
        if !amount.is_finite() || amount == 0.0 {
            return Err(Error::validation("amount must be a finite, non-zero number"));
        }
        let url = self.entry_url(key, QueryParams::new().push("incrementBy", amount))?;
        let request =
            RequestDescriptor::new(Method::Post, url).with_json(json!({ "entryValue": amount }));
        self.universe.execute(&request)
    }

    pub fn remove(&self, key: &str) -> ApiResult<Outcome> {
        let url = self.entry_url(key, QueryParams::new())?;
        self.universe.execute(&RequestDescriptor::new(Method::Delete, url))
    }

    pub fn list_keys(&self, prefix: Option<&str>, limit: Option<u32>) -> ApiResult<PageCursor> {
        let base = self.store_url(&["datastore", "entries"])?;
        let url = QueryParams::new()
            .push("dataStoreName", &self.name)
            .push("scope", &self.scope)
            .push_opt("prefix", prefix.filter(|prefix| !prefix.is_empty()))
            .push("limit", limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .to_url(&base);
        let shape = PageShape::default().with_items_field("keys");
        Ok(self.universe.paginate(RequestDescriptor::get(url), shape))
    }

    fn entry_url(&self, key: &str, extra: QueryParams) -> ApiResult<Url> {
        if key.is_empty() {
            return Err(Error::validation("entry key must not be empty"));
        }
        let base = self.store_url(&["datastore", "entries", "entry"])?;
        let mut url = QueryParams::new()
            .push("entryKey", key)
            .push("scope", &self.scope)
            .push("dataStoreName", &self.name)
            .to_url(&base);
        extra.apply_to(&mut url);
        Ok(url)
    }

    fn store_url(&self, tail: &[&str]) -> ApiResult<Url> {
        let id = self.universe.id().to_string();
        let mut segments = vec![
            "datastores",
            "v1",
            "universes",
            id.as_str(),
            "standard-datastores",
        ];
        segments.extend_from_slice(tail);
        self.universe.endpoint(&segments)
    }
}
