//! In-memory registry of conversion jobs.
//!
//! A conversion is admitted synchronously and completed by a background
//! task; the registry is what `GET /convert/{job_id}` polls. Terminal
//! states stick around for the process lifetime so late polls still get
//! an answer.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle of a conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Admitted, waiting for the background task to pick it up.
    Queued,
    /// Download in progress.
    Running,
    /// File on disk and filed into the playlist.
    Completed,
    /// Download or bookkeeping failed; the target file was cleaned up.
    Failed { error: String },
}

/// A single conversion job.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Job ID, handed to the client for polling.
    pub id: Uuid,
    /// Owning user; jobs are only visible to their owner.
    pub user_id: Uuid,
    /// Target playlist name.
    pub playlist: String,
    /// Canonical output filename.
    pub filename: String,
    /// Current state.
    pub state: JobState,
    /// Admission timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of reaching a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    fn new(user_id: Uuid, playlist: String, filename: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            playlist,
            filename,
            state: JobState::Queued,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::Failed { .. })
    }
}

/// Registry of all conversion jobs in this process.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, ConversionJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new job in the queued state.
    pub fn enqueue(&self, user_id: Uuid, playlist: &str, filename: &str) -> ConversionJob {
        let job = ConversionJob::new(user_id, playlist.to_string(), filename.to_string());
        self.jobs.write().insert(job.id, job.clone());
        tracing::info!(job_id = %job.id, user_id = %user_id, filename = %filename, "Conversion job queued");
        job
    }

    /// Look up a job.
    pub fn get(&self, id: Uuid) -> Option<ConversionJob> {
        self.jobs.read().get(&id).cloned()
    }

    /// Mark a job as running.
    pub fn mark_running(&self, id: Uuid) {
        self.transition(id, JobState::Running);
    }

    /// Mark a job as completed.
    pub fn complete(&self, id: Uuid) {
        self.transition(id, JobState::Completed);
    }

    /// Mark a job as failed with the given error message.
    pub fn fail(&self, id: Uuid, error: String) {
        self.transition(id, JobState::Failed { error });
    }

    fn transition(&self, id: Uuid, state: JobState) {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(&id) else {
            tracing::warn!(job_id = %id, "State transition for unknown job");
            return;
        };

        tracing::debug!(job_id = %id, from = ?job.state, to = ?state, "Job state transition");
        job.state = state;
        if job.is_finished() {
            job.finished_at = Some(Utc::now());
        }
    }
}
