use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::Job;

/// Why a poll attempt did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollFailure {
    /// HTTP status, or `None` when the request never got a response.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Classification of a single poll attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job is still processing.
    Pending,
    /// The job finished; carries the extracted artifact.
    Ready(Value),
    /// The job will never succeed without a new submission.
    Permanent(PollFailure),
    /// The attempt failed but waiting and asking again is safe.
    Transient(PollFailure),
}

/// Observed state of a remote job.
///
/// Flow: SUBMITTED → RUNNING → (SUCCEEDED | FAILED | TIMED_OUT), with
/// CANCELLED reachable from any non-terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Submitted,
    Running,
    Succeeded(Value),
    Failed(PollFailure),
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded(_) | JobState::Failed(_) | JobState::TimedOut | JobState::Cancelled
        )
    }

    pub fn label(&self) -> StateLabel {
        match self {
            JobState::Submitted => StateLabel::Submitted,
            JobState::Running => StateLabel::Running,
            JobState::Succeeded(_) => StateLabel::Succeeded,
            JobState::Failed(_) => StateLabel::Failed,
            JobState::TimedOut => StateLabel::TimedOut,
            JobState::Cancelled => StateLabel::Cancelled,
        }
    }
}

/// Payload-free name of a [`JobState`], used for history and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateLabel {
    Submitted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateLabel::Submitted => write!(f, "SUBMITTED"),
            StateLabel::Running => write!(f, "RUNNING"),
            StateLabel::Succeeded => write!(f, "SUCCEEDED"),
            StateLabel::Failed => write!(f, "FAILED"),
            StateLabel::TimedOut => write!(f, "TIMED_OUT"),
            StateLabel::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Input driving a job from one state to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Polled(PollOutcome),
    DeadlineExceeded,
    Cancelled,
}

/// What the caller should do after a signal was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still running; wait one interval and poll again.
    Wait,
    /// The job entered a terminal state.
    Complete,
    /// The job was already terminal; nothing changed.
    Ignored,
}

/// Drives a [`Job`] through its states.
pub struct StateMachine;

impl StateMachine {
    /// Apply `signal` to `job` and report the resulting transition.
    ///
    /// A poll on a `Submitted` job first enters `Running`, so every polled job
    /// records at least one `RUNNING` step. Terminal states absorb all signals.
    pub fn next(job: &mut Job, signal: Signal) -> Transition {
        if job.state.is_terminal() {
            return Transition::Ignored;
        }

        let next = match signal {
            Signal::Polled(outcome) => {
                job.polls += 1;
                let next = match outcome {
                    PollOutcome::Pending | PollOutcome::Transient(_) => JobState::Running,
                    PollOutcome::Ready(payload) => JobState::Succeeded(payload),
                    PollOutcome::Permanent(failure) => JobState::Failed(failure),
                };
                // A terminal answer on the first poll still passes through RUNNING.
                if job.state == JobState::Submitted && next.is_terminal() {
                    Self::enter(job, JobState::Running);
                }
                next
            }
            Signal::DeadlineExceeded => JobState::TimedOut,
            Signal::Cancelled => JobState::Cancelled,
        };

        let transition = if next.is_terminal() {
            Transition::Complete
        } else {
            Transition::Wait
        };
        Self::enter(job, next);
        transition
    }

    fn enter(job: &mut Job, next: JobState) {
        let previous = std::mem::replace(&mut job.state, next);
        job.state_history.push(previous.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn make_job() -> Job {
        Job::new("J1".to_string(), Duration::from_secs(60))
    }

    fn failure(status: u16, message: &str) -> PollFailure {
        PollFailure {
            status: Some(status),
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn pending_then_ready_walks_running_states() {
        let mut job = make_job();
        assert_eq!(job.state, JobState::Submitted);

        let t = StateMachine::next(&mut job, Signal::Polled(PollOutcome::Pending));
        assert_eq!(t, Transition::Wait);
        assert_eq!(job.state, JobState::Running);

        let t = StateMachine::next(&mut job, Signal::Polled(PollOutcome::Pending));
        assert_eq!(t, Transition::Wait);

        let t = StateMachine::next(
            &mut job,
            Signal::Polled(PollOutcome::Ready(json!("Hello"))),
        );
        assert_eq!(t, Transition::Complete);
        assert_eq!(job.state, JobState::Succeeded(json!("Hello")));
        assert_eq!(job.polls, 3);
        assert_eq!(
            job.state_history,
            vec![StateLabel::Submitted, StateLabel::Running, StateLabel::Running]
        );
    }

    #[tokio::test]
    async fn first_pending_poll_records_one_running_step() {
        let mut job = make_job();
        StateMachine::next(&mut job, Signal::Polled(PollOutcome::Pending));
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.state_history, vec![StateLabel::Submitted]);

        StateMachine::next(
            &mut job,
            Signal::Polled(PollOutcome::Transient(PollFailure {
                status: None,
                message: "connection reset".into(),
            })),
        );
        assert_eq!(
            job.state_history,
            vec![StateLabel::Submitted, StateLabel::Running]
        );
    }

    #[tokio::test]
    async fn first_poll_ready_passes_through_running() {
        let mut job = make_job();
        let t = StateMachine::next(&mut job, Signal::Polled(PollOutcome::Ready(json!("x"))));
        assert_eq!(t, Transition::Complete);
        assert_eq!(
            job.state_history,
            vec![StateLabel::Submitted, StateLabel::Running]
        );
    }

    #[tokio::test]
    async fn permanent_failure_is_terminal() {
        let mut job = make_job();
        let t = StateMachine::next(
            &mut job,
            Signal::Polled(PollOutcome::Permanent(failure(400, "bad input"))),
        );
        assert_eq!(t, Transition::Complete);
        assert_eq!(job.state, JobState::Failed(failure(400, "bad input")));
    }

    #[tokio::test]
    async fn transient_keeps_running() {
        let mut job = make_job();
        let t = StateMachine::next(
            &mut job,
            Signal::Polled(PollOutcome::Transient(PollFailure {
                status: None,
                message: "connection reset".into(),
            })),
        );
        assert_eq!(t, Transition::Wait);
        assert_eq!(job.state, JobState::Running);
    }

    #[tokio::test]
    async fn deadline_before_first_poll_times_out_from_submitted() {
        let mut job = make_job();
        let t = StateMachine::next(&mut job, Signal::DeadlineExceeded);
        assert_eq!(t, Transition::Complete);
        assert_eq!(job.state, JobState::TimedOut);
        assert_eq!(job.state_history, vec![StateLabel::Submitted]);
        assert_eq!(job.polls, 0);
    }

    #[tokio::test]
    async fn terminal_states_absorb_signals() {
        let mut job = make_job();
        StateMachine::next(&mut job, Signal::Polled(PollOutcome::Ready(json!("done"))));
        let history = job.state_history.clone();

        for signal in [
            Signal::Polled(PollOutcome::Pending),
            Signal::Polled(PollOutcome::Permanent(failure(500, "boom"))),
            Signal::DeadlineExceeded,
            Signal::Cancelled,
        ] {
            assert_eq!(StateMachine::next(&mut job, signal), Transition::Ignored);
        }
        assert_eq!(job.state, JobState::Succeeded(json!("done")));
        assert_eq!(job.state_history, history);
        assert_eq!(job.polls, 1);
    }

    #[tokio::test]
    async fn cancel_while_running() {
        let mut job = make_job();
        StateMachine::next(&mut job, Signal::Polled(PollOutcome::Pending));
        let t = StateMachine::next(&mut job, Signal::Cancelled);
        assert_eq!(t, Transition::Complete);
        assert_eq!(job.state.label(), StateLabel::Cancelled);
    }

    #[test]
    fn state_label_display() {
        assert_eq!(StateLabel::Submitted.to_string(), "SUBMITTED");
        assert_eq!(StateLabel::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!(
            serde_json::to_string(&StateLabel::TimedOut).unwrap(),
            r#""TIMED_OUT""#
        );
    }

    #[test]
    fn poll_failure_display() {
        assert_eq!(failure(404, "gone").to_string(), "status 404: gone");
        let none = PollFailure {
            status: None,
            message: "dns".into(),
        };
        assert_eq!(none.to_string(), "dns");
    }
}
