//! Store wrapper whose operations can be made to fail, for tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ShipyardError;
use crate::models::log::{LogRecord, NewLogRecord};
use crate::store::{LogReader, MemoryStore, Store};
use crate::streams::cursor::Cursor;

type Failures = Arc<Mutex<HashMap<&'static str, usize>>>;

fn trip(failures: &Failures, operation: &'static str) -> Result<(), ShipyardError> {
    let mut failures = failures.lock().unwrap_or_else(|e| e.into_inner());
    match failures.get_mut(operation) {
        Some(left) if *left > 0 => {
            *left -= 1;
            Err(ShipyardError::StoreError(format!("{}: connection reset", operation)))
        }
        _ => Ok(()),
    }
}

/// [`MemoryStore`] that fails the next calls of chosen operations
pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    failures: Failures,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failures: Failures::default(),
        }
    }

    /// Fail the next `times` calls of `operation`, named by its method
    pub fn fail(&self, operation: &'static str, times: usize) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation, times);
    }

    fn trip(&self, operation: &'static str) -> Result<(), ShipyardError> {
        trip(&self.failures, operation)
    }
}

struct FlakyReader {
    inner: Box<dyn LogReader>,
    failures: Failures,
}

#[async_trait]
impl LogReader for FlakyReader {
    async fn read_after(
        &mut self,
        key: &str,
        after: Cursor,
        block: Duration,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError> {
        trip(&self.failures, "read_after")?;
        self.inner.read_after(key, after, block, count).await
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn list_push_front(&self, key: &str, value: String) -> Result<(), ShipyardError> {
        self.trip("list_push_front")?;
        self.inner.list_push_front(key, value).await
    }

    async fn list_push_back(&self, key: &str, value: String) -> Result<(), ShipyardError> {
        self.trip("list_push_back")?;
        self.inner.list_push_back(key, value).await
    }

    async fn list_move_back(&self, from: &str, to: &str) -> Result<Option<String>, ShipyardError> {
        self.trip("list_move_back")?;
        self.inner.list_move_back(from, to).await
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, ShipyardError> {
        self.trip("list_all")?;
        self.inner.list_all(key).await
    }

    async fn list_replace(
        &self,
        from: &str,
        value: &str,
        to: &str,
        replacement: String,
    ) -> Result<usize, ShipyardError> {
        self.trip("list_replace")?;
        self.inner.list_replace(from, value, to, replacement).await
    }

    async fn list_clear(&self, key: &str) -> Result<usize, ShipyardError> {
        self.trip("list_clear")?;
        self.inner.list_clear(key).await
    }

    async fn value_get(&self, key: &str) -> Result<Option<String>, ShipyardError> {
        self.trip("value_get")?;
        self.inner.value_get(key).await
    }

    async fn log_append(&self, key: &str, record: &NewLogRecord) -> Result<Cursor, ShipyardError> {
        self.trip("log_append")?;
        self.inner.log_append(key, record).await
    }

    async fn log_range(
        &self,
        key: &str,
        after: Option<Cursor>,
        count: usize,
    ) -> Result<Vec<LogRecord>, ShipyardError> {
        self.trip("log_range")?;
        self.inner.log_range(key, after, count).await
    }

    async fn log_last_id(&self, key: &str) -> Result<Option<Cursor>, ShipyardError> {
        self.trip("log_last_id")?;
        self.inner.log_last_id(key).await
    }

    async fn log_reader(&self) -> Result<Box<dyn LogReader>, ShipyardError> {
        self.trip("log_reader")?;
        Ok(Box::new(FlakyReader {
            inner: self.inner.log_reader().await?,
            failures: self.failures.clone(),
        }))
    }
}
