//! Purpose: Client library for a remote key-value datastore and messaging service.
//! Exports: `api` (public surface) and `core` (dispatch, cache, pagination, errors).
//! Role: Shared by the `opencloud` CLI and downstream callers.
//! Invariants: All network traffic goes through `core::dispatch::Dispatcher`.
//! Invariants: Failures surface as `core::error::Error`; nothing retries.
pub mod api;
pub mod core;
