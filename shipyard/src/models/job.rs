//! Distribution jobs

use serde::{Deserialize, Serialize};

use crate::models::channel::Destinations;
use crate::models::string_or_number;
use crate::utils::{generate_uuid, now_rfc3339};

/// Progress label of a freshly enqueued job
pub const WAITING_FOR_WORKER: &str = "Waiting for worker assignment.";

/// Where a job was submitted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobSource {
    Filesystem,
    #[serde(alias = "unity-cloud")]
    CiWebhook,
    Direct,
}

/// Lifecycle stage of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(alias = "queued")]
    Queued,
    #[serde(alias = "running")]
    Running,
    #[serde(alias = "complete", alias = "completed")]
    Complete,
    #[serde(alias = "failed")]
    Failed,
}

impl JobStatus {
    /// Complete and Failed never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Complete => "Complete",
            JobStatus::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one CDN upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnUploadResult {
    pub channel: String,
    #[serde(default)]
    pub url: String,
    pub success: bool,
}

/// Outcome of one Steam upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteamUploadResult {
    pub channel: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub app_id: String,
    pub success: bool,
}

/// Per-channel results written when a job finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResults {
    #[serde(default)]
    pub cdn: Vec<CdnUploadResult>,
    #[serde(default)]
    pub steam: Vec<SteamUploadResult>,
}

/// Everything about a job that may leave the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub source: JobSource,
    pub project: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub platform: String,
    pub status: JobStatus,
    pub build_step: String,
    pub created_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    #[serde(default)]
    pub completed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_ingest_path: Option<String>,

    #[serde(default, rename = "steam_channel_labels")]
    pub steam_channel_labels: Vec<String>,

    #[serde(default, rename = "cdn_channel_labels")]
    pub cdn_channel_labels: Vec<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,

    #[serde(default, rename = "upload_results", skip_serializing_if = "Option::is_none")]
    pub upload_results: Option<UploadResults>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A job as stored in the queues
///
/// Carries the resolved channel snapshots, credentials included, for the
/// workers. Only the [`JobSummary`] part is ever returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(flatten)]
    pub summary: JobSummary,

    #[serde(flatten)]
    pub destinations: Destinations,
}

/// Fields supplied by an intake path
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub project: String,
    pub description: Option<String>,
    pub platform: String,
    pub ingest_path: Option<String>,
    pub absolute_ingest_path: Option<String>,
    pub steam_channel_labels: Vec<String>,
    pub cdn_channel_labels: Vec<String>,
    pub metadata: serde_json::Value,
}

impl Job {
    /// A new Queued job with a fresh id and the given channel snapshots
    pub fn create(source: JobSource, new: NewJob, destinations: Destinations) -> Self {
        Self {
            summary: JobSummary {
                id: generate_uuid(),
                source,
                project: new.project,
                description: new.description,
                platform: new.platform,
                status: JobStatus::Queued,
                build_step: WAITING_FOR_WORKER.to_string(),
                created_at: now_rfc3339(),
                started_at: None,
                completed_at: None,
                ingest_path: new.ingest_path,
                absolute_ingest_path: new.absolute_ingest_path,
                steam_channel_labels: new.steam_channel_labels,
                cdn_channel_labels: new.cdn_channel_labels,
                metadata: new.metadata,
                upload_results: None,
                error: None,
            },
            destinations,
        }
    }

    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn status(&self) -> JobStatus {
        self.summary.status
    }

    /// Public representation without channel snapshots
    pub fn into_summary(self) -> JobSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::channel::SteamChannel;

    fn sample() -> Job {
        Job::create(
            JobSource::Filesystem,
            NewJob {
                project: "Demo".to_string(),
                platform: "windows".to_string(),
                ingest_path: Some("demo/win".to_string()),
                steam_channel_labels: vec!["Beta".to_string()],
                ..Default::default()
            },
            Destinations {
                steam_channels: vec![SteamChannel {
                    id: "s1".to_string(),
                    label: "Beta".to_string(),
                    app_id: "480".to_string(),
                    branch: None,
                    depots: vec![],
                }],
                cdn_channels: vec![],
            },
        )
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = sample();
        assert_eq!(job.status(), JobStatus::Queued);
        assert_eq!(job.summary.build_step, WAITING_FOR_WORKER);
        assert!(job.summary.completed_at.is_none());
        assert_eq!(job.id().len(), 36);
    }

    #[test]
    fn test_stored_form_carries_snapshots() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status"], "Queued");
        assert_eq!(json["source"], "filesystem");
        assert_eq!(json["buildStep"], WAITING_FOR_WORKER);
        assert_eq!(json["ingestPath"], "demo/win");
        assert!(json["completedAt"].is_null());
        assert_eq!(json["steam_channels"][0]["appId"], "480");
        assert_eq!(json["steam_channel_labels"][0], "Beta");
    }

    #[test]
    fn test_summary_omits_snapshots() {
        let json = serde_json::to_value(sample().into_summary()).unwrap();
        assert!(json.get("steam_channels").is_none());
        assert!(json.get("cdn_channels").is_none());
        assert_eq!(json["steam_channel_labels"][0], "Beta");
    }

    #[test]
    fn test_reads_worker_written_jobs() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "source": "unity-cloud",
            "project": "Demo",
            "platform": "android",
            "status": "completed",
            "buildStep": "Done",
            "createdAt": "2025-01-01T00:00:00.000Z",
            "completedAt": "2025-01-01T00:10:00.000Z",
            "upload_results": { "cdn": [], "steam": [{ "channel": "Beta", "app_id": 480, "success": true }] }
        }))
        .unwrap();
        assert_eq!(job.summary.source, JobSource::CiWebhook);
        assert_eq!(job.status(), JobStatus::Complete);
        assert!(job.status().is_terminal());
        let results = job.summary.upload_results.unwrap();
        assert_eq!(results.steam[0].app_id, "480");
        assert!(job.destinations.steam_channels.is_empty());
    }
}
