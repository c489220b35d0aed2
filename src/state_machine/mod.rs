mod job;
mod state;

pub use job::{Job, JobSummary};
pub use state::{
    JobState, PollFailure, PollOutcome, Signal, StateLabel, StateMachine, Transition,
};
