//! Purpose: Own the configuration and dispatcher for one universe.
//! Exports: `Universe`.
//! Role: Entry point handed to façades; the only holder of mutable client settings.
//! Invariants: Setters take `&mut self`, so settings cannot change while a façade
//! borrows the universe.
//! Invariants: Cursors snapshot the configuration at creation time.
use super::datastore::DEFAULT_LIST_LIMIT;
use super::{DataStore, MessagingService, OrderedDataStore};
use crate::core::config::ClientConfig;
use crate::core::cursor::{PageCursor, PageShape};
use crate::core::dispatch::{Dispatcher, Outcome, RequestDescriptor};
use crate::core::error::{ApiResult, Error};
use crate::core::query::QueryParams;
use crate::core::transport::Transport;
use std::sync::Arc;
use tracing::warn;
use url::Url;

#[derive(Clone)]
pub struct Universe {
    dispatcher: Dispatcher,
}

impl Universe {
    pub fn new(universe_id: u64, api_key: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(universe_id, api_key))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        warn_if_anonymous(&config);
        Self {
            dispatcher: Dispatcher::new(config),
        }
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        warn_if_anonymous(&config);
        Self {
            dispatcher: Dispatcher::with_transport(config, transport),
        }
    }

    pub fn id(&self) -> u64 {
        self.dispatcher.config().universe_id
    }

    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.config()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        self.dispatcher.config_mut().api_key = api_key.into();
        self
    }

    pub fn set_universe_id(&mut self, universe_id: u64) -> &mut Self {
        self.dispatcher.config_mut().universe_id = universe_id;
        self
    }

    pub fn execute(&self, request: &RequestDescriptor) -> ApiResult<Outcome> {
        self.dispatcher.execute(request)
    }

    pub fn paginate(&self, request: RequestDescriptor, shape: PageShape) -> PageCursor {
        PageCursor::new(self.dispatcher.clone(), request, shape)
    }

    pub fn data_store(&self, name: impl Into<String>) -> DataStore<'_> {
        DataStore::new(self, name)
    }

    pub fn ordered_data_store(&self, name: impl Into<String>) -> OrderedDataStore<'_> {
        OrderedDataStore::new(self, name)
    }

    pub fn messaging(&self) -> MessagingService<'_> {
        MessagingService::new(self)
    }

    /// Standard datastores in this universe; an empty `prefix` lists all of them.
    pub fn list_data_stores(
        &self,
        prefix: Option<&str>,
        limit: Option<u32>,
    ) -> ApiResult<PageCursor> {
        let id = self.id().to_string();
        let base = self.endpoint(&["datastores", "v1", "universes", &id, "standard-datastores"])?;
        let url = QueryParams::new()
            .push_opt("prefix", prefix.filter(|prefix| !prefix.is_empty()))
            .push("limit", limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .to_url(&base);
        let shape = PageShape::default().with_items_field("datastores");
        Ok(self.paginate(RequestDescriptor::get(url), shape))
    }

    /// `base_url` joined with `segments`, each percent-encoded as one path segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.dispatcher.config().base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::validation("base url cannot be a base"))?;
            path.clear();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }
}

fn warn_if_anonymous(config: &ClientConfig) {
    if !config.has_api_key() {
        warn!(
            universe_id = config.universe_id,
            "no API key configured; requests will be rejected until one is set"
        );
    }
}
