//! Task submission and poll controller for generation jobs.
//!
//! One controller tracks at most one active job. Submitting again supersedes
//! the previous job: its polling loop is cancelled and any late responses are
//! discarded by a generation check, never applied to newer state.

mod controller;

pub use controller::{GenerateOptions, JobController, JobView, PollConfig, SubmitError};
