// src/dag/scheduler.rs

use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::pipeline::Pipeline;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{all_terminal, deps_satisfied, StateManager, TaskTable};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::tasks::TaskKind;

/// Pipeline graph plus the state of the current run.
///
/// A run starts with a trigger, pulls the triggered task and its downstream
/// tasks in, dispatches whatever has its dependencies done, and finishes once
/// nothing is pending or running. A fatal outcome fails everything still
/// waiting downstream of it.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: TaskTable,
    run_counter: u64,
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler for a validated [`Pipeline`].
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let graph = DagGraph::from_pipeline(pipeline);
        let tasks = graph.tasks().map(|k| (k, TaskInfo::new(k))).collect();
        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// `None` for a name that is not in the pipeline.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(&self.kind_of(task)?)?;
        Some(info.run_state.into())
    }

    /// Names of tasks taking part in the active run (empty when idle).
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.is_idle() {
            return Vec::new();
        }
        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.kind.as_str().to_string())
            .collect()
    }

    /// Whether every dependency of `task` is done for the current run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let kind = self.kind_of(task)?;
        Some(deps_satisfied(&self.graph, &self.tasks, kind))
    }

    /// Open a new run. Per-run state is reset; earlier successes still
    /// satisfy dependents that are not re-run.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        for info in self.tasks.values_mut() {
            info.run_state = None;
        }
        debug!(run_id = self.run_counter, "scheduler: run started");
    }

    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.step_trigger(task).newly_scheduled
    }

    pub fn handle_progress(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.step_progress(task).newly_scheduled
    }

    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// A trigger with no active run opens one.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        let Some(kind) = self.kind_of(task) else {
            warn!(task = %task, "trigger for task outside the pipeline; ignoring");
            // A run opened for nothing but unknown triggers must not linger.
            return SchedulerStep {
                run_just_finished: self.finish_run_if_done(),
                ..SchedulerStep::default()
            };
        };
        if self.is_idle() {
            self.start_new_run();
        }
        let run_id = self.run_counter;

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
        manager.include_downstream(kind);
        let newly_scheduled = manager.take_ready();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished: self.finish_run_if_done(),
        }
    }

    /// A long-lived task is up; for its dependents that counts as success.
    pub fn step_progress(&mut self, task: &str) -> SchedulerStep {
        self.step_completion(task, TaskOutcome::Success)
    }

    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "task reported back with no active run; ignoring");
            return SchedulerStep::default();
        };
        let Some(kind) = self.kind_of(task) else {
            warn!(task = %task, "report from task outside the pipeline; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();
        if let Some(info) = self.tasks.get_mut(&kind) {
            match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %kind, run_id, "task done");
                    step.newly_scheduled =
                        StateManager::new(&self.graph, &mut self.tasks, run_id).take_ready();
                }
                TaskOutcome::Fatal(reason) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(task = %kind, run_id, %reason, "task failed; failing dependents");
                    step.newly_failed.push(kind.as_str().to_string());
                    let skipped =
                        StateManager::new(&self.graph, &mut self.tasks, run_id).fail_downstream(kind);
                    step.newly_failed
                        .extend(skipped.into_iter().map(|k| k.as_str().to_string()));
                }
            }
        }

        step.run_just_finished = self.finish_run_if_done();
        step
    }

    /// Task names in this pipeline, in `TaskKind` order.
    pub fn task_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.graph.tasks().map(TaskKind::as_str)
    }

    fn kind_of(&self, task: &str) -> Option<TaskKind> {
        TaskKind::from_str(task)
            .ok()
            .filter(|kind| self.graph.contains(*kind))
    }

    fn finish_run_if_done(&mut self) -> bool {
        if self.is_idle() || !all_terminal(&self.tasks) {
            return false;
        }
        info!(run_id = self.current_run_id, "scheduler: run finished");
        self.current_run_id = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_wait_for_clean() {
        let mut scheduler = Scheduler::from_pipeline(&Pipeline::build());

        let step = scheduler.step_trigger("clean");
        assert_eq!(step.scheduled_names(), vec!["clean"]);
        assert_eq!(scheduler.run_state_of("styles"), Some(TaskRunState::Pending));
        assert_eq!(scheduler.deps_satisfied("styles"), Some(false));

        let step = scheduler.step_completion("clean", TaskOutcome::Success);
        assert_eq!(
            step.scheduled_names(),
            vec!["templates", "scripts", "styles", "images", "sprites"]
        );
        assert!(step.newly_scheduled.iter().all(|t| t.run_id == 1));
    }

    #[test]
    fn failure_fails_pending_dependents_and_finishes_run() {
        let mut scheduler = Scheduler::from_pipeline(&Pipeline::build());
        scheduler.step_trigger("clean");

        let step = scheduler.step_completion("clean", TaskOutcome::Fatal("boom".into()));
        assert_eq!(step.newly_failed.len(), 6);
        assert_eq!(step.newly_failed[0], "clean");
        assert!(step.run_just_finished);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn long_lived_progress_counts_as_success() {
        let mut scheduler = Scheduler::from_pipeline(&Pipeline::dev_default());
        for kind in TaskKind::ASSET_TASKS {
            scheduler.step_trigger(kind.as_str());
        }
        for kind in TaskKind::ASSET_TASKS {
            scheduler.step_completion(kind.as_str(), TaskOutcome::Success);
        }
        assert_eq!(scheduler.run_state_of("watch"), Some(TaskRunState::Running));

        scheduler.step_progress("watch");
        let step = scheduler.step_progress("serve");
        assert!(step.run_just_finished);
        assert!(scheduler.tasks_in_current_run().is_empty());
    }

    #[test]
    fn later_runs_rely_on_earlier_success() {
        let mut scheduler = Scheduler::from_pipeline(&Pipeline::build());
        scheduler.step_trigger("clean");
        scheduler.step_completion("clean", TaskOutcome::Success);
        for kind in TaskKind::ASSET_TASKS {
            scheduler.step_completion(kind.as_str(), TaskOutcome::Success);
        }
        assert!(scheduler.is_idle());

        // Re-triggering one asset task does not re-run clean.
        let step = scheduler.step_trigger("styles");
        assert_eq!(step.scheduled_names(), vec!["styles"]);
        assert_eq!(scheduler.current_run_id(), Some(2));
    }

    #[test]
    fn run_opened_for_unknown_names_closes_again() {
        let mut scheduler = Scheduler::from_pipeline(&Pipeline::single(TaskKind::Styles));
        scheduler.start_new_run();
        let step = scheduler.step_trigger("sprites");
        assert!(step.run_just_finished);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn names_outside_the_pipeline_are_ignored() {
        let mut scheduler = Scheduler::from_pipeline(&Pipeline::single(TaskKind::Styles));
        assert!(scheduler.step_trigger("clean").newly_scheduled.is_empty());
        assert!(scheduler.step_trigger("nonsense").newly_scheduled.is_empty());
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.run_state_of("clean"), None);
        assert_eq!(scheduler.task_names().collect::<Vec<_>>(), vec!["styles"]);
    }
}
