//! Lifecycle queues
//!
//! Four ordered lists in the shared store, one per lifecycle stage. New jobs
//! are pushed at the head, workers claim from the tail, so claims are
//! oldest-first.

use std::str::FromStr;
use std::sync::Arc;

use shipyard_api::QueueListing;
use tracing::{debug, info, warn};

use crate::errors::ShipyardError;
use crate::models::job::{Job, JobSummary};
use crate::store::{keys, Store};

pub mod ledger;
pub mod lifecycle;

/// One of the four lifecycle queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueName {
    Queued,
    Running,
    Complete,
    Failed,
}

impl QueueName {
    pub const ALL: [QueueName; 4] = [
        QueueName::Queued,
        QueueName::Running,
        QueueName::Complete,
        QueueName::Failed,
    ];

    /// Store key of the list
    pub fn key(&self) -> &'static str {
        match self {
            QueueName::Queued => keys::QUEUED_JOBS,
            QueueName::Running => keys::RUNNING_JOBS,
            QueueName::Complete => keys::COMPLETE_JOBS,
            QueueName::Failed => keys::FAILED_JOBS,
        }
    }
}

impl FromStr for QueueName {
    type Err = ShipyardError;

    /// Only the four public names; store keys and status spellings are not queue names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(QueueName::Queued),
            "running" => Ok(QueueName::Running),
            "complete" => Ok(QueueName::Complete),
            "failed" => Ok(QueueName::Failed),
            _ => Err(ShipyardError::invalid(format!(
                "Unknown queue \"{}\". Expected one of: queued, running, complete, failed",
                s
            ))),
        }
    }
}

/// Read and bulk-manage the lifecycle queues
#[derive(Clone)]
pub struct QueueStore {
    store: Arc<dyn Store>,
}

impl QueueStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Push a new job at the head of the Queued list
    pub async fn enqueue(&self, job: &Job) -> Result<(), ShipyardError> {
        let raw = serde_json::to_string(job)?;
        self.store
            .list_push_front(QueueName::Queued.key(), raw)
            .await?;
        info!("Enqueued job {} ({})", job.id(), job.summary.project);
        Ok(())
    }

    /// Full stored jobs of one queue, head first
    pub async fn jobs(&self, queue: QueueName) -> Result<Vec<Job>, ShipyardError> {
        let raw = self.store.list_all(queue.key()).await?;
        Ok(parse_jobs(queue, raw))
    }

    /// Public view of all four queues
    ///
    /// Four independent reads: a job moving between queues meanwhile may be
    /// seen twice or not at all.
    pub async fn list_all(&self) -> Result<QueueListing<JobSummary>, ShipyardError> {
        let summaries = |jobs: Vec<Job>| jobs.into_iter().map(Job::into_summary).collect();
        Ok(QueueListing {
            queued_jobs: summaries(self.jobs(QueueName::Queued).await?),
            running_jobs: summaries(self.jobs(QueueName::Running).await?),
            complete_jobs: summaries(self.jobs(QueueName::Complete).await?),
            failed_jobs: summaries(self.jobs(QueueName::Failed).await?),
        })
    }

    /// Remove every job of one queue, returning how many there were
    pub async fn clear(&self, queue: QueueName) -> Result<usize, ShipyardError> {
        let removed = self.store.list_clear(queue.key()).await?;
        info!("Cleared {} job(s) from {}", removed, queue.key());
        Ok(removed)
    }
}

fn parse_jobs(queue: QueueName, raw: Vec<String>) -> Vec<Job> {
    raw.into_iter()
        .filter_map(|item| match serde_json::from_str::<Job>(&item) {
            Ok(job) => Some(job),
            Err(e) => {
                // Unreadable entries are skipped rather than failing the listing.
                // The payload may carry channel credentials, so only its size is logged.
                warn!("Skipping unreadable job in {}: {}", queue.key(), e);
                debug!("Unreadable job payload: {} bytes", item.len());
                None
            }
        })
        .collect()
}
