//! API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Filesystem job submission
///
/// Every field is defaulted so that a missing field surfaces as a validation
/// message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub project: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub platform: String,

    #[serde(default, rename = "ingestPath")]
    pub ingest_path: String,

    #[serde(default)]
    pub steam_channel_labels: Vec<String>,

    #[serde(default)]
    pub cdn_channel_labels: Vec<String>,

    /// Older single-destination form, folded into the label lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_channel_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_channel_label: Option<String>,
}

impl SubmitJobRequest {
    /// Steam labels in submission order, including the single-label form
    pub fn steam_labels(&self) -> Vec<String> {
        merge_labels(&self.steam_channel_labels, self.steam_channel_label.as_deref())
    }

    /// CDN labels in submission order, including the single-label form
    pub fn cdn_labels(&self) -> Vec<String> {
        merge_labels(&self.cdn_channel_labels, self.cdn_channel_label.as_deref())
    }
}

fn merge_labels(labels: &[String], single: Option<&str>) -> Vec<String> {
    let mut merged = labels.to_vec();
    if let Some(label) = single.filter(|l| !l.is_empty()) {
        if !merged.iter().any(|l| l == label) {
            merged.push(label.to_string());
        }
    }
    merged
}

/// Aggregated validation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorsResponse {
    pub errors: Vec<String>,
}

/// Single error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A single job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse<J> {
    pub job: J,
}

/// All four queues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsResponse<J> {
    pub jobs: QueueListing<J>,
}

/// Jobs grouped by lifecycle queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueListing<J> {
    pub queued_jobs: Vec<J>,
    pub running_jobs: Vec<J>,
    pub complete_jobs: Vec<J>,
    pub failed_jobs: Vec<J>,
}

/// Query string of the clear-queue endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearQueueQuery {
    pub queue: Option<String>,
}

/// Result of clearing a queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsRemovedResponse {
    pub items_removed: usize,
}

/// Channel listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsResponse<C> {
    pub channels: Vec<C>,
}

/// A single channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelResponse<C> {
    pub channel: C,
}

/// Webhook mapping listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingsResponse<M> {
    pub mappings: Vec<M>,
}

/// A single webhook mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingResponse<M> {
    pub mapping: M,
}

/// Result of deleting a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
    pub id: String,
}

/// Log entry severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// One entry of a job log stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stream cursor, `<millis>-<seq>`
    pub id: String,
    pub timestamp: String,
    pub level: LogLevel,
    pub line: String,
}

/// Bounded history of a job log stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub entries: Vec<LogEntry>,
    pub last_id: String,
}

/// Query string of the tail endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TailQuery {
    /// `$` for new entries only, or the last cursor already seen
    pub from: Option<String>,
}

/// Sentinel cursor meaning "only entries appended after this call"
pub const TAIL_FROM_LATEST: &str = "$";

/// Comment text of the tail keep-alive frame
pub const HEARTBEAT_COMMENT: &str = "heartbeat";

/// Tail frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailEventKind {
    Connected,
    Entry,
    Error,
}

/// Envelope carried in the `data:` field of every tail frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailEvent {
    #[serde(rename = "type")]
    pub kind: TailEventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LogEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TailEvent {
    pub fn connected() -> Self {
        Self {
            kind: TailEventKind::Connected,
            id: None,
            data: None,
            message: None,
        }
    }

    pub fn entry(entry: LogEntry) -> Self {
        Self {
            kind: TailEventKind::Entry,
            id: Some(entry.id.clone()),
            data: Some(entry),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: TailEventKind::Error,
            id: None,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_event_envelope_shape() {
        let event = TailEvent::entry(LogEntry {
            id: "1700000000000-0".to_string(),
            timestamp: "2025-01-01T00:00:00".to_string(),
            level: LogLevel::Error,
            line: "boom".to_string(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "entry");
        assert_eq!(json["id"], "1700000000000-0");
        assert_eq!(json["data"]["level"], "error");
        assert!(json.get("message").is_none());

        let connected = serde_json::to_value(TailEvent::connected()).unwrap();
        assert_eq!(connected, serde_json::json!({ "type": "connected" }));
    }

    #[test]
    fn test_submit_request_tolerates_missing_fields() {
        let request: SubmitJobRequest = serde_json::from_str(r#"{"project":"Demo"}"#).unwrap();
        assert_eq!(request.project, "Demo");
        assert!(request.platform.is_empty());
        assert!(request.steam_channel_labels.is_empty());
    }

    #[test]
    fn test_single_label_form_is_folded_in() {
        let request: SubmitJobRequest = serde_json::from_str(
            r#"{"cdn_channel_labels":["A"],"cdn_channel_label":"B","steam_channel_label":""}"#,
        )
        .unwrap();
        assert_eq!(request.cdn_labels(), vec!["A", "B"]);
        assert!(request.steam_labels().is_empty());
    }

    #[test]
    fn test_listing_uses_camel_case_keys() {
        let listing: QueueListing<u8> = QueueListing {
            queued_jobs: vec![1],
            running_jobs: vec![],
            complete_jobs: vec![],
            failed_jobs: vec![],
        };
        let json = serde_json::to_value(JobsResponse { jobs: listing }).unwrap();
        assert_eq!(json["jobs"]["queuedJobs"], serde_json::json!([1]));
        assert!(json["jobs"].get("failedJobs").is_some());
    }
}
