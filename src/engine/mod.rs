// src/engine/mod.rs

//! Event-driven pipeline engine.
//!
//! [`CoreRuntime`] is a synchronous state machine: it takes one
//! [`RuntimeEvent`] at a time and answers with [`CoreCommand`]s. [`Runtime`]
//! is the async shell that reads events from a channel and hands dispatched
//! tasks to an executor backend.

/// Task names as they travel through events.
pub type TaskName = String;

/// Outcome of a task for the scheduler.
///
/// Per-file compile errors are handled inside a task and still yield
/// `Success`; only path/configuration/tool errors are `Fatal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Fatal(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Pipeline roots seeded at startup.
    Manual,
    FileWatch,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Stop once nothing is running or queued. Set for pipelines without a
    /// long-lived task.
    pub exit_when_idle: bool,
}

/// Inputs to the engine. The watcher sends triggers, the executor sends
/// progress and completion, the Ctrl-C handler sends shutdown.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Request a run of `task` and its dependents.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A long-lived task is up; its dependents may start.
    TaskProgressed {
        task: TaskName,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
