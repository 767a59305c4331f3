//! Job intake
//!
//! Validates submissions, snapshots the requested channels and enqueues new
//! jobs. The filesystem gateway and the webhook path share
//! [`Gateway::enqueue`].

use std::sync::Arc;

use shipyard_api::SubmitJobRequest;
use tracing::{info, warn};

use crate::errors::ShipyardError;
use crate::filesys::dir::Dir;
use crate::models::channel::Destinations;
use crate::models::job::{Job, JobSource, NewJob};
use crate::queue::QueueStore;
use crate::registry::Registry;

pub mod path;

/// Validates and enqueues new jobs
#[derive(Clone)]
pub struct Gateway {
    registry: Registry,
    queues: QueueStore,
    ingest_base: Arc<Dir>,
}

impl Gateway {
    pub fn new(registry: Registry, queues: QueueStore, ingest_base: Dir) -> Self {
        Self {
            registry,
            queues,
            ingest_base: Arc::new(ingest_base),
        }
    }

    /// Create a job for a build already placed under the ingest directory
    ///
    /// Every violated rule is reported at once.
    pub async fn submit(&self, request: SubmitJobRequest) -> Result<Job, ShipyardError> {
        let steam_labels = request.steam_labels();
        let cdn_labels = request.cdn_labels();
        let mut errors = Vec::new();

        if request.project.trim().is_empty() {
            errors.push("Project is required".to_string());
        }
        if request.platform.trim().is_empty() {
            errors.push("Platform is required".to_string());
        }
        if steam_labels.is_empty() && cdn_labels.is_empty() {
            errors.push("At least one Steam or CDN channel is required".to_string());
        }

        let path_errors = path::validate(&request.ingest_path);
        let syntax_ok = path_errors.is_empty();
        errors.extend(path_errors);

        // Only a syntactically safe path is ever touched on disk
        let mut absolute = None;
        if syntax_ok {
            let dir = self.ingest_base.subdir(&request.ingest_path);
            match dir.check().await {
                Ok(true) => absolute = Some(dir.path().to_string_lossy().into_owned()),
                Ok(false) => errors.push(format!(
                    "Ingest path \"{}\" does not exist or is not a directory",
                    request.ingest_path
                )),
                Err(e) => {
                    warn!("Could not check ingest path {}: {}", request.ingest_path, e);
                    errors.push(format!(
                        "Ingest path \"{}\" could not be read",
                        request.ingest_path
                    ));
                }
            }
        }

        // Labels are resolved even when other checks failed, so one response
        // lists every problem
        let resolved = match self.registry.resolve(&steam_labels, &cdn_labels).await {
            Ok(destinations) => Some(destinations),
            Err(ShipyardError::Validation(label_errors)) => {
                errors.extend(label_errors);
                None
            }
            Err(e) => return Err(e),
        };
        let destinations = match resolved {
            Some(destinations) if errors.is_empty() => destinations,
            _ => return Err(ShipyardError::Validation(errors)),
        };

        let description = request.description.filter(|d| !d.trim().is_empty());
        self.accept(
            JobSource::Filesystem,
            NewJob {
                project: request.project,
                description,
                platform: request.platform,
                ingest_path: Some(request.ingest_path),
                absolute_ingest_path: absolute,
                steam_channel_labels: steam_labels,
                cdn_channel_labels: cdn_labels,
                metadata: serde_json::Value::Object(Default::default()),
            },
            destinations,
        )
        .await
    }

    /// Resolve the job's labels and push it onto the Queued list
    ///
    /// Nothing is enqueued unless every label resolves.
    pub async fn enqueue(&self, source: JobSource, new: NewJob) -> Result<Job, ShipyardError> {
        let destinations = self
            .registry
            .resolve(&new.steam_channel_labels, &new.cdn_channel_labels)
            .await?;
        self.accept(source, new, destinations).await
    }

    async fn accept(
        &self,
        source: JobSource,
        new: NewJob,
        destinations: Destinations,
    ) -> Result<Job, ShipyardError> {
        let job = Job::create(source, new, destinations);
        self.queues.enqueue(&job).await?;
        info!(
            "Accepted {:?} job {} for {} ({} Steam, {} CDN channel(s))",
            source,
            job.id(),
            job.summary.platform,
            job.destinations.steam_channels.len(),
            job.destinations.cdn_channels.len()
        );
        Ok(job)
    }
}
