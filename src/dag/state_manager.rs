// src/dag/state_manager.rs

//! State transitions within one pipeline run.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::tasks::TaskKind;

pub type TaskTable = BTreeMap<TaskKind, TaskInfo>;

/// Borrowed view of the scheduler used to apply one transition.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut TaskTable,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DagGraph, tasks: &'a mut TaskTable, run_id: u64) -> Self {
        Self {
            graph,
            tasks,
            run_id,
        }
    }

    /// Pull `root` and everything downstream of it into the run. Tasks that
    /// already take part keep their state.
    pub fn include_downstream(&mut self, root: TaskKind) {
        for kind in self.graph.downstream_of(root) {
            if let Some(info) = self.tasks.get_mut(&kind) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %kind, run_id = self.run_id, "joined run as Pending");
                }
            }
        }
    }

    /// Fail every pending or running task downstream of `failed`; returns
    /// them without `failed` itself.
    pub fn fail_downstream(&mut self, failed: TaskKind) -> Vec<TaskKind> {
        let mut newly_failed = Vec::new();
        for kind in self.graph.downstream_of(failed).into_iter().skip(1) {
            let Some(info) = self.tasks.get_mut(&kind) else {
                continue;
            };
            if matches!(info.run_state, Some(RunState::Pending | RunState::Running)) {
                info.run_state = Some(RunState::DoneFailed);
                debug!(task = %kind, upstream = %failed, "skipped after upstream failure");
                newly_failed.push(kind);
            }
        }
        newly_failed
    }

    /// Mark every pending task whose dependencies are satisfied as running
    /// and return them in `TaskKind` order.
    pub fn take_ready(&mut self) -> Vec<ScheduledTask> {
        let ready: Vec<TaskKind> = self
            .tasks
            .values()
            .filter(|info| info.run_state == Some(RunState::Pending))
            .filter(|info| deps_satisfied(self.graph, self.tasks, info.kind))
            .map(|info| info.kind)
            .collect();

        ready
            .into_iter()
            .filter_map(|kind| {
                let info = self.tasks.get_mut(&kind)?;
                info.run_state = Some(RunState::Running);
                info!(
                    task = %kind,
                    run_id = self.run_id,
                    rerun = info.has_run_before(),
                    "dependencies satisfied; scheduling"
                );
                Some(ScheduledTask::new(kind, self.run_id))
            })
            .collect()
    }
}

/// Every dependency of `kind` is done for the current run.
pub fn deps_satisfied(graph: &DagGraph, tasks: &TaskTable, kind: TaskKind) -> bool {
    graph.dependencies_of(kind).iter().all(|dep| {
        tasks
            .get(dep)
            .is_some_and(TaskInfo::satisfies_dependents)
    })
}

/// No task is pending or running.
pub fn all_terminal(tasks: &TaskTable) -> bool {
    tasks
        .values()
        .all(|info| info.run_state.is_none_or(RunState::is_terminal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Pipeline;

    fn table(graph: &DagGraph) -> TaskTable {
        graph.tasks().map(|k| (k, TaskInfo::new(k))).collect()
    }

    #[test]
    fn ready_tasks_come_out_in_kind_order() {
        let graph = DagGraph::from_pipeline(&Pipeline::build());
        let mut tasks = table(&graph);
        let mut manager = StateManager::new(&graph, &mut tasks, 1);

        manager.include_downstream(TaskKind::Clean);
        let first: Vec<_> = manager.take_ready().into_iter().map(|t| t.kind).collect();
        assert_eq!(first, vec![TaskKind::Clean]);
        assert!(manager.take_ready().is_empty());

        tasks.get_mut(&TaskKind::Clean).unwrap().run_state = Some(RunState::DoneSuccess);
        let mut manager = StateManager::new(&graph, &mut tasks, 1);
        let next: Vec<_> = manager.take_ready().into_iter().map(|t| t.kind).collect();
        assert_eq!(next, TaskKind::ASSET_TASKS.to_vec());
        assert!(!all_terminal(&tasks));
    }

    #[test]
    fn failure_skips_only_tasks_still_in_flight() {
        let graph = DagGraph::from_pipeline(&Pipeline::dev_default());
        let mut tasks = table(&graph);
        let mut manager = StateManager::new(&graph, &mut tasks, 1);
        manager.include_downstream(TaskKind::Styles);

        let failed = manager.fail_downstream(TaskKind::Styles);
        assert_eq!(failed, vec![TaskKind::Watch, TaskKind::Serve]);
        assert_eq!(tasks[&TaskKind::Styles].run_state, Some(RunState::Pending));
        assert_eq!(tasks[&TaskKind::Scripts].run_state, None);
    }
}
