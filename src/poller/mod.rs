//! The poll loop: turns a remote job into one awaited result.
//!
//! Each iteration checks cancellation and the job deadline, issues exactly one
//! query, classifies it and either returns or waits one interval. The wait is
//! clamped to the deadline and ends early on cancellation.

mod cancel;
mod classify;

pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use classify::{
    Classifier, NOT_READY_STATUSES, PENDING_MESSAGES, PendingRule, default_rules, error_message,
};

use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::error::DocJobError;
use crate::service::Transport;
use crate::state_machine::{Job, JobState, PollOutcome, Signal, StateMachine, Transition};

pub struct Poller<'a, T> {
    transport: &'a T,
    classifier: &'a Classifier,
    interval: Duration,
}

impl<'a, T: Transport> Poller<'a, T> {
    pub fn new(transport: &'a T, classifier: &'a Classifier, interval: Duration) -> Self {
        Self {
            transport,
            classifier,
            interval,
        }
    }

    /// Poll `job` until it reaches a terminal state and return its payload.
    ///
    /// Returns exactly once. After the first `Ready` or `Permanent`
    /// classification no further query or wait happens.
    pub async fn run(&self, job: &mut Job, cancel: &CancelToken) -> Result<Value, DocJobError> {
        let mut transport_failures = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Self::finish(job, Signal::Cancelled);
            }
            if job.is_expired() {
                return Self::finish(job, Signal::DeadlineExceeded);
            }

            let outcome = match self.transport.fetch_result(&job.id).await {
                Ok(reply) => {
                    transport_failures = 0;
                    self.classifier.classify(&reply)
                }
                Err(err) => {
                    let outcome = self
                        .classifier
                        .classify_transport_error(&err, transport_failures);
                    transport_failures += 1;
                    outcome
                }
            };

            match &outcome {
                PollOutcome::Pending => debug!(job_id = %job.id, poll = job.polls + 1, "job still processing"),
                PollOutcome::Transient(failure) => {
                    warn!(job_id = %job.id, attempt = transport_failures, "transient poll failure: {failure}")
                }
                _ => {}
            }

            match StateMachine::next(job, Signal::Polled(outcome)) {
                Transition::Wait => {}
                Transition::Complete | Transition::Ignored => return Self::result_of(job),
            }

            let wake = Instant::now()
                .checked_add(self.interval)
                .map_or(job.deadline, |next| next.min(job.deadline));
            tokio::select! {
                _ = sleep_until(wake) => {}
                _ = cancel.cancelled() => return Self::finish(job, Signal::Cancelled),
            }
        }
    }

    fn finish(job: &mut Job, signal: Signal) -> Result<Value, DocJobError> {
        StateMachine::next(job, signal);
        Self::result_of(job)
    }

    fn result_of(job: &Job) -> Result<Value, DocJobError> {
        let job_id = job.id.clone();
        match &job.state {
            JobState::Succeeded(payload) => {
                info!(%job_id, polls = job.polls, elapsed_ms = u64::try_from(job.elapsed().as_millis()).unwrap_or(u64::MAX), "job succeeded");
                Ok(payload.clone())
            }
            JobState::Failed(failure) => {
                warn!(%job_id, polls = job.polls, "job failed: {failure}");
                Err(DocJobError::PermanentPoll {
                    job_id,
                    status: failure.status,
                    message: failure.message.clone(),
                })
            }
            JobState::TimedOut => {
                warn!(%job_id, polls = job.polls, "job timed out");
                Err(DocJobError::TimedOut {
                    job_id,
                    after: job.timeout,
                })
            }
            JobState::Cancelled => {
                info!(%job_id, "job cancelled");
                Err(DocJobError::Cancelled { job_id })
            }
            JobState::Submitted | JobState::Running => Err(DocJobError::PermanentPoll {
                job_id,
                status: None,
                message: "poll loop stopped before the job finished".into(),
            }),
        }
    }
}
