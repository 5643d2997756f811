// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`executor_loop`] owns the running task instances.
//! - [`task_runner`] runs one scheduled task and reports back with
//!   `RuntimeEvent`s.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests substitute their own backend.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
