use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::state::{JobState, StateLabel};

/// Deadline offset used when `started + timeout` does not fit in an
/// `Instant`. Roughly thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// One remote extraction job, owned by the call that awaits it.
#[derive(Debug, Clone)]
pub struct Job {
    /// Opaque identifier assigned by the service.
    pub id: String,
    pub state: JobState,
    pub state_history: Vec<StateLabel>,
    /// Number of status queries issued so far.
    pub polls: u32,
    pub timeout: Duration,
    pub created_at: DateTime<Utc>,
    pub started: Instant,
    /// `started + timeout`, capped about thirty years out; no query is started at
    /// or after this instant.
    pub deadline: Instant,
}

impl Job {
    pub fn new(id: String, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            id,
            state: JobState::Submitted,
            state_history: Vec::new(),
            polls: 0,
            timeout,
            created_at: Utc::now(),
            started,
            deadline: started
                .checked_add(timeout)
                .unwrap_or_else(|| started + FAR_FUTURE),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Report produced once a job reached a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub final_state: StateLabel,
    pub state_transitions: Vec<StateLabel>,
    pub polls: u32,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl JobSummary {
    pub fn from_job(job: &Job) -> Self {
        let mut transitions = job.state_history.clone();
        transitions.push(job.state.label());

        Self {
            job_id: job.id.clone(),
            final_state: job.state.label(),
            state_transitions: transitions,
            polls: job.polls,
            created_at: job.created_at,
            finished_at: Utc::now(),
            duration_ms: u64::try_from(job.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
