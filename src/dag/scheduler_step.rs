// src/dag/scheduler_step.rs

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// What one scheduler call changed.
///
/// The production API only needs `newly_scheduled`; the `step_*` variants
/// return the whole record so tests can walk a pipeline by hand.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready and were marked running.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The failed task plus every dependent it took down in this run.
    pub newly_failed: Vec<TaskName>,
    /// The run finished with this step.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    /// Names of the newly scheduled tasks, in dispatch order.
    pub fn scheduled_names(&self) -> Vec<&str> {
        self.newly_scheduled.iter().map(|t| t.name.as_str()).collect()
    }
}
