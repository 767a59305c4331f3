//! Worker-side job transitions
//!
//! Claims jobs, appends to their log streams and files them under Complete or
//! Failed. Every move goes through the lifecycle state machine, so a job that
//! reached a terminal state is never rewritten.

use std::sync::Arc;

use shipyard_api::LogLevel;
use tracing::{debug, info, warn};

use crate::errors::ShipyardError;
use crate::models::job::{Job, UploadResults};
use crate::models::log::NewLogRecord;
use crate::queue::lifecycle::{self, JobEvent};
use crate::queue::QueueName;
use crate::store::{keys, Store};
use crate::streams::cursor::Cursor;

/// A job taken off the Queued list by this worker
///
/// Remembers the exact snapshot written to the Running list so it can be
/// removed again by value.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: Job,
    running_snapshot: String,
}

impl ClaimedJob {
    /// Take over a job read back from the Running list, e.g. after a restart
    pub fn adopt(job: Job) -> Result<Self, ShipyardError> {
        let running_snapshot = serde_json::to_string(&job)?;
        Ok(Self {
            job,
            running_snapshot,
        })
    }

    pub fn id(&self) -> &str {
        self.job.id()
    }
}

/// Queue transitions on behalf of a worker
#[derive(Clone)]
pub struct WorkerLedger {
    store: Arc<dyn Store>,
}

impl WorkerLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Take the oldest queued job and move it to Running
    ///
    /// Returns `None` when nothing is queued. The raw entry moves to Running
    /// in one store step and is then rewritten in place with the claimed
    /// state, so a failure in between leaves it in Running rather than
    /// nowhere. Unreadable entries are set aside under Failed unchanged.
    pub async fn claim(&self) -> Result<Option<ClaimedJob>, ShipyardError> {
        loop {
            let Some(raw) = self
                .store
                .list_move_back(QueueName::Queued.key(), QueueName::Running.key())
                .await?
            else {
                return Ok(None);
            };

            let mut job: Job = match serde_json::from_str(&raw) {
                Ok(job) => job,
                Err(e) => {
                    warn!("Setting aside unreadable queued job: {}", e);
                    self.set_aside(&raw).await?;
                    continue;
                }
            };

            if let Err(e) = lifecycle::apply(&mut job, JobEvent::Claim) {
                warn!("Setting aside queued job {} in unexpected state: {}", job.id(), e);
                self.set_aside(&raw).await?;
                continue;
            }

            let running_snapshot = serde_json::to_string(&job)?;
            let running = QueueName::Running.key();
            self.store
                .list_replace(running, &raw, running, running_snapshot.clone())
                .await?;
            info!("Claimed job {}", job.id());
            self.log(&job, LogLevel::Info, format!("Analyzing job {}...", job.id()))
                .await?;

            return Ok(Some(ClaimedJob {
                job,
                running_snapshot,
            }));
        }
    }

    /// Move an entry this worker cannot run from Running to Failed as is
    async fn set_aside(&self, raw: &str) -> Result<(), ShipyardError> {
        self.store
            .list_replace(
                QueueName::Running.key(),
                raw,
                QueueName::Failed.key(),
                raw.to_string(),
            )
            .await?;
        Ok(())
    }

    /// Append a line to the job's log stream
    pub async fn log(
        &self,
        job: &Job,
        level: LogLevel,
        line: impl Into<String>,
    ) -> Result<Cursor, ShipyardError> {
        let record = NewLogRecord::new(level, line);
        let id = self
            .store
            .log_append(&keys::job_stream(job.id()), &record)
            .await?;
        debug!("Logged {} for job {}", id, job.id());
        Ok(id)
    }

    /// File a running job under Complete with its upload results
    pub async fn complete(
        &self,
        claimed: ClaimedJob,
        results: UploadResults,
    ) -> Result<Job, ShipyardError> {
        self.finish(claimed, JobEvent::Succeed(results), QueueName::Complete)
            .await
    }

    /// File a running job under Failed with an error message
    pub async fn fail(
        &self,
        claimed: ClaimedJob,
        message: impl Into<String>,
    ) -> Result<Job, ShipyardError> {
        let message = message.into();
        let event = JobEvent::Fail(message.clone());
        lifecycle::next_status(claimed.job.status(), &event)?;
        self.log(
            &claimed.job,
            LogLevel::Error,
            format!("Aborting job {}: {}", claimed.id(), message),
        )
        .await?;
        self.finish(claimed, event, QueueName::Failed).await
    }

    async fn finish(
        &self,
        claimed: ClaimedJob,
        event: JobEvent,
        target: QueueName,
    ) -> Result<Job, ShipyardError> {
        let ClaimedJob {
            mut job,
            running_snapshot,
        } = claimed;

        // Validate before touching the store so a rejected move changes nothing
        lifecycle::apply(&mut job, event)?;

        let removed = self
            .store
            .list_replace(
                QueueName::Running.key(),
                &running_snapshot,
                target.key(),
                serde_json::to_string(&job)?,
            )
            .await?;
        if removed == 0 {
            warn!("Job {} was no longer in the running queue", job.id());
        }
        info!("Job {} is now {}", job.id(), job.status());
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::channel::Destinations;
    use crate::models::job::{JobSource, JobStatus, NewJob};
    use crate::store::flaky::FlakyStore;
    use crate::store::MemoryStore;

    async fn queued(store: &MemoryStore) -> Job {
        let job = Job::create(
            JobSource::Direct,
            NewJob {
                project: "demo".to_string(),
                platform: "windows".to_string(),
                ..Default::default()
            },
            Destinations::default(),
        );
        store
            .list_push_front(QueueName::Queued.key(), serde_json::to_string(&job).unwrap())
            .await
            .unwrap();
        job
    }

    async fn stored(store: &MemoryStore, queue: QueueName) -> Vec<Job> {
        store
            .list_all(queue.key())
            .await
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_failed_rewrite_leaves_job_in_running() {
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        let job = queued(&store.inner).await;
        let ledger = WorkerLedger::new(store.clone());

        store.fail("list_replace", 1);
        assert!(ledger.claim().await.is_err());

        // Still the queued snapshot, but not lost
        let running = stored(&store.inner, QueueName::Running).await;
        assert_eq!(running, vec![job.clone()]);
        assert!(stored(&store.inner, QueueName::Queued).await.is_empty());

        let adopted = ClaimedJob::adopt(running[0].clone()).unwrap();
        assert_eq!(adopted.id(), job.id());
    }

    #[tokio::test]
    async fn test_failed_move_leaves_job_queued() {
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        let job = queued(&store.inner).await;
        let ledger = WorkerLedger::new(store.clone());

        store.fail("list_move_back", 1);
        assert!(ledger.claim().await.is_err());
        assert_eq!(stored(&store.inner, QueueName::Queued).await, vec![job.clone()]);

        let claimed = ledger.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id(), job.id());
        assert_eq!(claimed.job.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn test_failed_finish_keeps_running_snapshot() {
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        queued(&store.inner).await;
        let ledger = WorkerLedger::new(store.clone());
        let claimed = ledger.claim().await.unwrap().unwrap();

        store.fail("list_replace", 1);
        assert!(ledger.complete(claimed.clone(), UploadResults::default()).await.is_err());
        assert_eq!(stored(&store.inner, QueueName::Running).await, vec![claimed.job.clone()]);
        assert!(stored(&store.inner, QueueName::Complete).await.is_empty());

        let job = ledger.complete(claimed, UploadResults::default()).await.unwrap();
        assert_eq!(job.status(), JobStatus::Complete);
        assert!(stored(&store.inner, QueueName::Running).await.is_empty());
        assert_eq!(stored(&store.inner, QueueName::Complete).await, vec![job]);
    }
}
