use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetpipe::dag::ScheduledTask;
use assetpipe::engine::{RuntimeEvent, TaskOutcome};
use assetpipe::errors::Result;
use assetpipe::exec::ExecutorBackend;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - reports `TaskProgressed` for long-lived tasks
/// - reports `TaskCompleted` for everything else, `Fatal` for tasks named
///   in `failing`, `Success` otherwise.
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    /// Make `task` fail fatally every time it runs.
    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let event = if t.long_lived {
                    RuntimeEvent::TaskProgressed {
                        task: t.name.clone(),
                    }
                } else if failing.contains(&t.name) {
                    RuntimeEvent::TaskCompleted {
                        task: t.name.clone(),
                        outcome: TaskOutcome::Fatal(format!("{} failed", t.name)),
                    }
                } else {
                    RuntimeEvent::TaskCompleted {
                        task: t.name.clone(),
                        outcome: TaskOutcome::Success,
                    }
                };
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
