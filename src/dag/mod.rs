// src/dag/mod.rs

//! Pipeline shapes and scheduling.
//!
//! - [`pipeline`] defines the fixed compositions (`build`, `default`, single tasks).
//! - [`graph`] keeps adjacency for a pipeline.
//! - [`scheduler`] is the per-run state machine deciding which tasks are ready.
//! - [`state_manager`] applies per-run state transitions.

pub mod graph;
pub mod pipeline;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use pipeline::{Pipeline, PipelineNode};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
