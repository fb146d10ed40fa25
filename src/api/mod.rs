//! Purpose: Public surface of the client: the universe handle and its façades.
//! Exports: Core request/response types plus `Universe`, `DataStore`, `OrderedDataStore`,
//! `MessagingService`.
//! Role: Callers build requests here; all network traffic flows through `core`.
//! Invariants: Façades never talk to the transport directly.

mod datastore;
mod messaging;
mod ordered;
mod universe;

pub use crate::core::cache::{CacheEntry, CacheKey, EntryCache};
pub use crate::core::classify::INVALID_IMAGE_MESSAGE;
pub use crate::core::config::ClientConfig;
pub use crate::core::cursor::{Page, PageCursor, PageShape};
pub use crate::core::dispatch::{
    Dispatcher, NormalizedResult, Outcome, RequestBody, RequestDescriptor,
};
pub use crate::core::error::{ApiResult, Error, ErrorKind, to_exit_code};
pub use crate::core::query::QueryParams;
pub use crate::core::transport::{
    HttpRequest, HttpResponse, Method, Transport, TransportError, UreqTransport,
};
pub use datastore::{DataStore, EntryAttributes, MAX_ENTRY_BYTES};
pub use messaging::{MAX_TOPIC_LEN, MessagingService};
pub use ordered::{MAX_PAGE_SIZE, OrderedDataStore, SortOrder};
pub use universe::Universe;
