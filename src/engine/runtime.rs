// src/engine/runtime.rs

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::{AssetpipeError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Async shell around [`CoreRuntime`]: feeds it events from the channel and
/// carries out the commands it returns.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// What the loop does after a batch of commands.
enum Flow {
    Continue,
    Stop,
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Process events until the pipeline finishes, Ctrl-C arrives or every
    /// sender is gone.
    ///
    /// A fatal task outcome ends the loop with
    /// [`AssetpipeError::TaskFailed`].
    pub async fn run(mut self) -> Result<()> {
        let started = Instant::now();
        info!("assetpipe runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime event");
            let step = self.core.step(event);

            let mut flow = if step.keep_running {
                Flow::Continue
            } else {
                Flow::Stop
            };
            for command in step.commands {
                if let Flow::Stop = self.apply(command, started).await? {
                    flow = Flow::Stop;
                }
            }
            if let Flow::Stop = flow {
                return Ok(());
            }
        }

        info!("runtime event channel closed; exiting");
        Ok(())
    }

    async fn apply(&mut self, command: CoreCommand, started: Instant) -> Result<Flow> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.dispatch(tasks).await?;
                Ok(Flow::Continue)
            }
            CoreCommand::RequestExit => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "pipeline finished");
                Ok(Flow::Stop)
            }
            CoreCommand::Abort { task, reason } => Err(AssetpipeError::TaskFailed { task, reason }),
        }
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        debug!(
            tasks = ?tasks.iter().map(|t| (t.name.as_str(), t.run_id)).collect::<Vec<_>>(),
            "dispatching ready tasks"
        );
        self.executor.spawn_ready_tasks(tasks).await
    }
}
