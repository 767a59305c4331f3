//! Shared store abstraction
//!
//! All durable state (queues, registries, job log streams) lives behind
//! [`Store`]. Handlers never coordinate through process memory: every
//! guarantee comes from the atomicity of a single store primitive.
//!
//! Two primitive families are exposed:
//! - ordered lists: push at either end, full range, clear-and-count, and
//!   two moves between lists that never leave an element in neither
//! - append-only ordered logs: append, bounded range, last cursor, and a
//!   blocking read through a dedicated [`LogReader`]

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ShipyardError;
use crate::models::log::{LogRecord, NewLogRecord};
use crate::streams::cursor::Cursor;

#[cfg(test)]
pub(crate) mod flaky;
pub mod keys;
pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Atomic ordered-list and append-only-log primitives
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert at the head of a list
    async fn list_push_front(&self, key: &str, value: String) -> Result<(), ShipyardError>;

    /// Insert at the tail of a list
    async fn list_push_back(&self, key: &str, value: String) -> Result<(), ShipyardError>;

    /// Move the tail of `from` onto the tail of `to` in one step, returning it
    async fn list_move_back(&self, from: &str, to: &str) -> Result<Option<String>, ShipyardError>;

    /// Whole list, head first
    async fn list_all(&self, key: &str) -> Result<Vec<String>, ShipyardError>;

    /// Remove the first `value` from `from` and append `replacement` to `to`
    /// in one step
    ///
    /// Returns how many elements were removed (0 or 1). The append happens
    /// either way.
    async fn list_replace(
        &self,
        from: &str,
        value: &str,
        to: &str,
        replacement: String,
    ) -> Result<usize, ShipyardError>;

    /// Remove the whole list atomically, returning its former length
    async fn list_clear(&self, key: &str) -> Result<usize, ShipyardError>;

    /// Plain string value
    async fn value_get(&self, key: &str) -> Result<Option<String>, ShipyardError>;

    /// Append to a log stream, returning the cursor assigned to the entry
    async fn log_append(&self, key: &str, record: &NewLogRecord) -> Result<Cursor, ShipyardError>;

    /// Up to `count` entries, oldest first, strictly after `after` when given
    async fn log_range(
        &self,
        key: &str,
        after: Option<Cursor>,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError>;

    /// Cursor of the newest entry, if the stream has any
    async fn log_last_id(&self, key: &str) -> Result<Option<Cursor>, ShipyardError>;

    /// Open a reader for blocking reads; one per tail
    async fn log_reader(&self) -> Result<Box<dyn LogReader>, ShipyardError>;
}

/// Blocking reads against log streams
#[async_trait]
pub trait LogReader: Send {
    /// Wait up to `block` for entries strictly after `after`
    ///
    /// Returns an empty batch on timeout.
    async fn read_after(
        &mut self,
        key: &str,
        after: Cursor,
        block: Duration,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError>;
}
