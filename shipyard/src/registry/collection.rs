//! Keyed record collections stored as one list

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::ShipyardError;
use crate::models::channel::Record;
use crate::store::Store;
use crate::utils::generate_uuid;

/// CRUD over a list of JSON records, unique by [`Record::key`]
///
/// Updates and deletes read the whole list, modify it and write it back. That
/// rewrite is not atomic: concurrent edits of the same collection race and
/// the last writer wins.
pub struct Collection<R> {
    store: Arc<dyn Store>,
    key: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Collection<R> {
    pub fn new(store: Arc<dyn Store>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _record: PhantomData,
        }
    }

    /// Every readable record, in insertion order
    pub async fn list(&self) -> Result<Vec<R>, ShipyardError> {
        let raw = self.store.list_all(self.key).await?;
        Ok(raw
            .iter()
            .filter_map(|item| match serde_json::from_str::<R>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable {} record: {}", R::KIND, e);
                    None
                }
            })
            .collect())
    }

    /// Record with exactly this key
    pub async fn find_by_key(&self, key: &str) -> Result<Option<R>, ShipyardError> {
        Ok(self.list().await?.into_iter().find(|r| r.key() == key))
    }

    /// Validate, assign an id and append
    pub async fn create(&self, mut record: R) -> Result<R, ShipyardError> {
        validate(&record)?;

        let existing = self.list().await?;
        if existing.iter().any(|r| r.key() == record.key()) {
            return Err(duplicate(&record));
        }

        record.set_id(generate_uuid());
        self.store
            .list_push_back(self.key, serde_json::to_string(&record)?)
            .await?;
        info!("Created {} {} ({})", R::KIND, record.id(), record.key());
        Ok(record)
    }

    /// Replace the record with `id`, keeping its id
    pub async fn update(&self, id: &str, mut record: R) -> Result<R, ShipyardError> {
        validate(&record)?;

        let mut records = self.list().await?;
        let index = position(&records, id)?;
        if records
            .iter()
            .any(|r| r.id() != id && r.key() == record.key())
        {
            return Err(duplicate(&record));
        }

        record.set_id(id.to_string());
        records[index] = record.clone();
        self.rewrite(&records).await?;
        info!("Updated {} {}", R::KIND, id);
        Ok(record)
    }

    /// Remove the record with `id`
    pub async fn delete(&self, id: &str) -> Result<R, ShipyardError> {
        let mut records = self.list().await?;
        let index = position(&records, id)?;
        let removed = records.remove(index);
        self.rewrite(&records).await?;
        info!("Deleted {} {}", R::KIND, id);
        Ok(removed)
    }

    async fn rewrite(&self, records: &[R]) -> Result<(), ShipyardError> {
        self.store.list_clear(self.key).await?;
        for record in records {
            self.store
                .list_push_back(self.key, serde_json::to_string(record)?)
                .await?;
        }
        Ok(())
    }
}

fn validate<R: Record>(record: &R) -> Result<(), ShipyardError> {
    let errors = record.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ShipyardError::Validation(errors))
    }
}

fn position<R: Record>(records: &[R], id: &str) -> Result<usize, ShipyardError> {
    records
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| ShipyardError::NotFound(format!("{} {} not found", R::KIND, id)))
}

fn duplicate<R: Record>(record: &R) -> ShipyardError {
    ShipyardError::Conflict(format!(
        "{} with {} \"{}\" already exists",
        R::KIND,
        R::KEY_NAME,
        record.key()
    ))
}
