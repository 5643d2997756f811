// src/dag/task_info.rs

//! Per-task bookkeeping kept by the scheduler.

use crate::engine::TaskName;
use crate::tasks::TaskKind;

/// Where a task stands in the current run (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of this run, waiting on dependencies.
    Pending,
    /// Handed to the executor.
    Running,
    /// Completed, or up and running if long-lived.
    DoneSuccess,
    /// Failed, or skipped because something upstream failed.
    DoneFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::DoneSuccess | RunState::DoneFailed)
    }
}

/// Read-only view of a task's state, including "not part of this run".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub kind: TaskKind,
    /// `None` while the task sits out the current run.
    pub run_state: Option<RunState>,
    pub last_successful_run: Option<u64>,
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }

    /// Whether a dependent may treat this task as done for the current run:
    /// it succeeded in this run, or it sits this run out and succeeded in an
    /// earlier one (a watch-triggered `styles` run does not redo `clean`).
    pub fn satisfies_dependents(&self) -> bool {
        match self.run_state {
            Some(RunState::DoneSuccess) => true,
            Some(_) => false,
            None => self.last_successful_run.is_some(),
        }
    }

    pub fn has_run_before(&self) -> bool {
        self.last_successful_run.is_some() || self.last_failed_run.is_some()
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub kind: TaskKind,
    pub long_lived: bool,
    /// All tasks dispatched within the same pipeline run share a `run_id`.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn new(kind: TaskKind, run_id: u64) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            long_lived: kind.is_long_lived(),
            run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_success_satisfies_only_outside_the_run() {
        let mut info = TaskInfo::new(TaskKind::Clean);
        assert!(!info.satisfies_dependents());

        info.last_successful_run = Some(1);
        assert!(info.satisfies_dependents());

        info.run_state = Some(RunState::Running);
        assert!(!info.satisfies_dependents());
    }

    #[test]
    fn scheduled_task_carries_kind_traits() {
        let task = ScheduledTask::new(TaskKind::Serve, 3);
        assert_eq!(task.name, "serve");
        assert!(task.long_lived);
        assert_eq!(task.run_id, 3);
    }
}
