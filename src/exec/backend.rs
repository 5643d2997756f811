// src/exec/backend.rs

//! Seam between the runtime and whatever actually runs tasks.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::tasks::BuildContext;

use super::executor_loop::spawn_executor;

/// Receives the tasks the core decided to dispatch.
///
/// Implementations report back through the runtime event channel; a test
/// backend can answer with `TaskCompleted` directly instead of building
/// anything.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Hands tasks to the in-process executor loop.
#[derive(Debug)]
pub struct RealExecutorBackend {
    queue: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    pub fn new(ctx: BuildContext, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            queue: spawn_executor(ctx, runtime_tx),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let queue = &self.queue;
        Box::pin(async move {
            for task in tasks {
                queue.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
