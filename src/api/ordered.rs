//! Purpose: Ordered datastore calls (ranked integer entries).
//! Exports: `OrderedDataStore`, `SortOrder`, `MAX_PAGE_SIZE`.
//! Role: Thin request builder over the dispatcher; listings return a `PageCursor`.
//! Invariants: Page size is clamped to `MAX_PAGE_SIZE`.
use super::Universe;
use crate::core::cursor::{PageCursor, PageShape};
use crate::core::dispatch::{Outcome, RequestDescriptor};
use crate::core::error::{ApiResult, Error};
use crate::core::query::QueryParams;
use crate::core::transport::Method;
use serde_json::json;
use url::Url;

pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_SCOPE: &str = "global";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Desc => "desc",
            SortOrder::Asc => "asc",
        }
    }
}

#[derive(Clone)]
pub struct OrderedDataStore<'u> {
    universe: &'u Universe,
    name: String,
    scope: String,
}

impl<'u> OrderedDataStore<'u> {
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

    /// `filter` uses the server's range syntax, e.g. `entry>=20&&entry<=30`.
    pub fn list(
        &self,
        order: SortOrder,
        limit: u32,
        filter: Option<&str>,
    ) -> ApiResult<PageCursor> {
        let base = self.entries_url(None)?;
        let url = QueryParams::new()
            .push("order_by", order.as_str())
            .push_opt("filter", filter.filter(|filter| !filter.is_empty()))
            .push("max_page_size", limit.clamp(1, MAX_PAGE_SIZE))
            .to_url(&base);
        let shape = PageShape::new("entries", "nextPageToken", "page_token");
        Ok(self.universe.paginate(RequestDescriptor::get(url), shape))
    }

    pub fn create(&self, key: &str, value: i64) -> ApiResult<Outcome> {
        ensure_key(key)?;
        let url = QueryParams::new()
            .push("id", key)
            .to_url(&self.entries_url(None)?);
        let request =
            RequestDescriptor::new(Method::Post, url).with_json(json!({ "value": value }));
        self.universe.execute(&request)
    }

    pub fn get(&self, key: &str) -> ApiResult<Outcome> {
        let url = self.entries_url(Some(key))?;
        self.universe.execute(&RequestDescriptor::get(url))
    }

    pub fn remove(&self, key: &str) -> ApiResult<Outcome> {
        let url = self.entries_url(Some(key))?;
        self.universe.execute(&RequestDescriptor::new(Method::Delete, url))
    }

    pub fn update(&self, key: &str, value: i64, allow_missing: bool) -> ApiResult<Outcome> {
        let url = QueryParams::new()
            .push("allow_missing", allow_missing)
            .to_url(&self.entries_url(Some(key))?);
        let request =
            RequestDescriptor::new(Method::Patch, url).with_json(json!({ "value": value }));
        self.universe.execute(&request)
    }

    pub fn increment(&self, key: &str, amount: i64) -> ApiResult<Outcome> {
        ensure_key(key)?;
        let url = self.entries_url(Some(&format!("{key}:increment")))?;
        let request =
            RequestDescriptor::new(Method::Post, url).with_json(json!({ "amount": amount }));
        self.universe.execute(&request)
    }

    fn entries_url(&self, key: Option<&str>) -> ApiResult<Url> {
        let id = self.universe.id().to_string();
        let mut segments = vec![
            "ordered-data-stores",
            "v1",
            "universes",
            id.as_str(),
            "orderedDataStores",
            self.name.as_str(),
            "scopes",
            self.scope.as_str(),
            "entries",
        ];
        if let Some(key) = key {
            ensure_key(key)?;
            segments.push(key);
        }
        self.universe.endpoint(&segments)
    }
}

fn ensure_key(key: &str) -> ApiResult<()> {
    if key.is_empty() {
        return Err(Error::validation("entry key must not be empty"));
    }
    Ok(())
}
