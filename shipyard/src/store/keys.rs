//! Key layout of the shared store
//!
//! Workers read and write the same keys, so these names are part of the
//! external contract.

pub const QUEUED_JOBS: &str = "queued_jobs";
pub const RUNNING_JOBS: &str = "running_jobs";
pub const COMPLETE_JOBS: &str = "complete_jobs";
pub const FAILED_JOBS: &str = "failed_jobs";

pub const STEAM_CHANNELS: &str = "steam_channels";
pub const CDN_CHANNELS: &str = "cdn_channels";
pub const WEBHOOK_MAPPINGS: &str = "webhook_mappings";

/// Log stream of a job
pub fn job_stream(job_id: &str) -> String {
    format!("job_stream:{}", job_id)
}

/// Marker written by the session collaborator for a live session token
pub fn session(token: &str) -> String {
    format!("session:{}", token)
}
