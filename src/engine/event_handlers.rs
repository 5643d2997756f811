// src/engine/event_handlers.rs

//! How the core reacts to each kind of runtime event.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the process exits (finite pipeline went idle).
    RequestExit,
    /// A task failed fatally; stop everything and report the failure.
    Abort { task: TaskName, reason: String },
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stopping(command: CoreCommand) -> Self {
        Self {
            commands: vec![command],
            keep_running: false,
        }
    }
}

fn dispatch(commands: &mut Vec<CoreCommand>, ready: Vec<ScheduledTask>) {
    if !ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(ready));
    }
}

/// Handle a trigger from startup or the source watcher.
///
/// Idle: open a run with this trigger plus anything queued. During a run: a
/// task not yet in it joins immediately (the five asset roots start in
/// parallel this way), a task already in it is queued for the next run.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    debug!(task = %task, ?reason, "trigger received");

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.drain_pending().into_iter().collect();
        triggers.insert(task);
        return CoreStep::running(open_run(scheduler, triggers));
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => debug!(task = %task, "not part of this pipeline; ignoring"),
        Some(TaskRunState::NotInRun) => dispatch(&mut commands, scheduler.handle_trigger(&task)),
        Some(_) => queue.record_trigger(&task),
    }
    CoreStep::running(commands)
}

/// A long-lived task is up.
pub fn handle_task_progress(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
) -> CoreStep {
    let mut commands = Vec::new();
    dispatch(&mut commands, scheduler.handle_progress(&task));
    commands.extend(open_queued_run(scheduler, queue));
    CoreStep::running(commands)
}

/// A task finished. A fatal outcome aborts the whole invocation; otherwise
/// dependents are dispatched, a queued run may start, and a finite pipeline
/// exits once nothing is left to do.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    if let TaskOutcome::Fatal(reason) = &outcome {
        let reason = reason.clone();
        scheduler.handle_completion(&task, outcome);
        return CoreStep::stopping(CoreCommand::Abort { task, reason });
    }

    let mut commands = Vec::new();
    dispatch(&mut commands, scheduler.handle_completion(&task, outcome));
    commands.extend(open_queued_run(scheduler, queue));

    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }
    CoreStep::running(commands)
}

/// Start a run seeded with `triggers`, in name order.
fn open_run(scheduler: &mut Scheduler, triggers: BTreeSet<TaskName>) -> Vec<CoreCommand> {
    if triggers.is_empty() {
        return Vec::new();
    }
    scheduler.start_new_run();
    let ready: Vec<ScheduledTask> = triggers
        .iter()
        .flat_map(|task| scheduler.handle_trigger(task))
        .collect();

    let mut commands = Vec::new();
    dispatch(&mut commands, ready);
    commands
}

fn open_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }
    open_run(scheduler, queue.drain_pending().into_iter().collect())
}
