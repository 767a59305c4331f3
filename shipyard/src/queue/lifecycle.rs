//! Finite state machine for the job lifecycle

use crate::errors::ShipyardError;
use crate::models::job::{Job, JobStatus, UploadResults};
use crate::utils::now_rfc3339;

/// Job lifecycle event
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A worker picked the job up
    Claim,

    /// Every upload finished
    Succeed(UploadResults),

    /// The job could not be completed
    Fail(String),
}

impl JobEvent {
    fn name(&self) -> &'static str {
        match self {
            JobEvent::Claim => "claim",
            JobEvent::Succeed(_) => "succeed",
            JobEvent::Fail(_) => "fail",
        }
    }
}

/// Next status for `event` in `state`, if the transition is allowed
pub fn next_status(state: JobStatus, event: &JobEvent) -> Result<JobStatus, ShipyardError> {
    match (state, event) {
        (JobStatus::Queued, JobEvent::Claim) => Ok(JobStatus::Running),
        (JobStatus::Running, JobEvent::Succeed(_)) => Ok(JobStatus::Complete),
        (JobStatus::Running, JobEvent::Fail(_)) => Ok(JobStatus::Failed),
        (state, event) => Err(ShipyardError::InvalidTransition(format!(
            "{} -> {}",
            state,
            event.name()
        ))),
    }
}

/// Apply `event` to `job`, updating status, timestamps and results
///
/// The job is left untouched when the transition is rejected.
pub fn apply(job: &mut Job, event: JobEvent) -> Result<(), ShipyardError> {
    let status = next_status(job.status(), &event)?;
    let summary = &mut job.summary;

    match event {
        JobEvent::Claim => {
            summary.started_at = Some(now_rfc3339());
            summary.build_step = "Preparing upload.".to_string();
        }
        JobEvent::Succeed(results) => {
            summary.completed_at = Some(now_rfc3339());
            summary.build_step = "Upload complete.".to_string();
            summary.upload_results = Some(results);
        }
        JobEvent::Fail(message) => {
            summary.completed_at = Some(now_rfc3339());
            summary.build_step = "Upload failed.".to_string();
            summary.error = Some(message);
        }
    }

    summary.status = status;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::channel::Destinations;
    use crate::models::job::{JobSource, NewJob};

    fn queued() -> Job {
        Job::create(JobSource::Direct, NewJob::default(), Destinations::default())
    }

    #[test]
    fn test_happy_path() {
        let mut job = queued();
        apply(&mut job, JobEvent::Claim).unwrap();
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.summary.started_at.is_some());

        apply(&mut job, JobEvent::Succeed(UploadResults::default())).unwrap();
        assert_eq!(job.status(), JobStatus::Complete);
        assert!(job.summary.completed_at.is_some());
        assert!(job.summary.upload_results.is_some());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [JobStatus::Complete, JobStatus::Failed] {
            for event in [
                JobEvent::Claim,
                JobEvent::Succeed(UploadResults::default()),
                JobEvent::Fail("again".to_string()),
            ] {
                assert!(next_status(terminal, &event).is_err());
            }
        }
    }

    #[test]
    fn test_rejected_transition_leaves_job_untouched() {
        let mut job = queued();
        let before = job.clone();
        let err = apply(&mut job, JobEvent::Fail("too early".to_string())).unwrap_err();
        assert!(matches!(err, ShipyardError::InvalidTransition(_)));
        assert_eq!(job, before);
    }
}
