// src/exec/executor_loop.rs

//! Background loop owning every running task instance.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_scheduled;
use crate::tasks::{BuildContext, TaskKind};

struct Instance {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Instance {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Per task kind, at most one instance runs at a time.
struct Executor {
    ctx: BuildContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    instances: HashMap<TaskKind, Instance>,
}

impl Executor {
    async fn accept(&mut self, task: ScheduledTask) {
        if let Some(previous) = self.instances.get_mut(&task.kind).filter(|i| i.is_live()) {
            if task.long_lived {
                // Already up: dependents of the new run only need the progress signal.
                debug!(task = %task.name, run_id = task.run_id, "long-lived task still up");
                let _ = self
                    .runtime_tx
                    .send(RuntimeEvent::TaskProgressed {
                        task: task.name.clone(),
                    })
                    .await;
                return;
            }
            info!(task = %task.name, run_id = task.run_id, "restarting task still in flight");
            if let Some(cancel) = previous.cancel.take() {
                // The old instance may have finished in between.
                let _ = cancel.send(());
            }
        }

        let kind = task.kind;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(run_scheduled(
            task,
            self.ctx.clone(),
            self.runtime_tx.clone(),
            cancel_rx,
        ));
        self.instances.insert(
            kind,
            Instance {
                cancel: Some(cancel_tx),
                handle,
            },
        );
    }

    fn shutdown(self) {
        for instance in self.instances.into_values() {
            instance.handle.abort();
        }
    }
}

/// Start the executor loop and return the sender it consumes.
///
/// A long-lived task that is already running is not started twice; a finite
/// task rescheduled while running has its previous instance cancelled.
pub fn spawn_executor(
    ctx: BuildContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);
    let mut executor = Executor {
        ctx,
        runtime_tx,
        instances: HashMap::new(),
    };

    tokio::spawn(async move {
        debug!("executor loop started");
        while let Some(task) = rx.recv().await {
            executor.accept(task).await;
        }
        executor.shutdown();
        debug!("executor loop stopped");
    });

    tx
}
