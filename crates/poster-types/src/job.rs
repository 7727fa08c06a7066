//! Active-job state model and the rules for applying status snapshots.

use crate::{GenerateRequest, PosterResult, TaskStatus, TaskStatusResponse};

/// The service sent something the status contract does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("status value outside the documented set")]
    UnknownStatus,
    #[error("completed status without a result payload")]
    CompletedWithoutResult,
    #[error("failed status without an error detail")]
    FailedWithoutError,
}

/// One submitted generation job as tracked by the controller.
///
/// Created `Pending` at submission time; mutated only through [`apply`] and
/// [`fail`]. Once a terminal status is reached no further snapshot changes it.
///
/// [`apply`]: JobState::apply
/// [`fail`]: JobState::fail
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub task_id: String,
    pub request: GenerateRequest,
    pub status: TaskStatus,
    pub progress: u8,
    pub result: Option<PosterResult>,
    pub error: Option<String>,
}

impl JobState {
    pub fn pending(task_id: impl Into<String>, request: GenerateRequest) -> Self {
        Self {
            task_id: task_id.into(),
            request,
            status: TaskStatus::Pending,
            progress: 0,
            result: None,
            error: None,
        }
    }

    /// Apply one status snapshot. Returns `true` when anything changed.
    ///
    /// Snapshots for a different task id and snapshots arriving after a
    /// terminal status are ignored; duplicate delivery of the same snapshot is
    /// a no-op. Progress never goes backwards within a job, which guards
    /// against a slow response overtaken by a newer one.
    pub fn apply(&mut self, snap: &TaskStatusResponse) -> Result<bool, ContractViolation> {
        if snap.task_id != self.task_id || self.status.is_terminal() {
            return Ok(false);
        }
        match snap.status {
            TaskStatus::Unknown => return Err(ContractViolation::UnknownStatus),
            TaskStatus::Completed if snap.result.is_none() => {
                return Err(ContractViolation::CompletedWithoutResult)
            }
            TaskStatus::Failed if snap.error.as_deref().unwrap_or("").is_empty() => {
                return Err(ContractViolation::FailedWithoutError)
            }
            _ => {}
        }

        let mut changed = false;
        if self.status != snap.status {
            self.status = snap.status;
            changed = true;
        }
        let progress = snap.progress.min(100).max(self.progress);
        if self.progress != progress {
            self.progress = progress;
            changed = true;
        }
        match snap.status {
            TaskStatus::Completed => {
                if self.result != snap.result {
                    self.result = snap.result.clone();
                    changed = true;
                }
            }
            TaskStatus::Failed => {
                if self.error != snap.error {
                    self.error = snap.error.clone();
                    changed = true;
                }
            }
            _ => {}
        }
        Ok(changed)
    }

    /// Force the job into a client-side failure (timeout, contract violation,
    /// unreachable service). No-op once terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(message.into());
        true
    }
}
