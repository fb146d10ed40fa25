// Request pipeline: transport, dispatch, caching, pagination, and error classification.
pub mod cache;
pub mod classify;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod query;
pub mod transport;
