// src/exec/task_runner.rs

//! Runs one scheduled task in-process and reports back to the runtime.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::serve::DevServer;
use crate::tasks::{run_task, BuildContext, TaskKind};
use crate::watch::{build_profiles_from_config, spawn_watcher};

/// Run `task` to completion (or, for long-lived tasks, until cancelled or
/// failed) and send the matching runtime events.
///
/// - Finite tasks send `TaskCompleted` with `Success` (per-file errors were
///   already reported) or `Fatal`.
/// - Long-lived tasks send `TaskProgressed` once they are up, and only send
///   `TaskCompleted` if they stop with an error.
/// - A cancelled instance sends nothing.
pub async fn run_scheduled(
    task: ScheduledTask,
    ctx: BuildContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let name = task.name.clone();
    let run_id = task.run_id;
    info!(task = %name, run_id, env = %ctx.env, "starting task");

    let work = async {
        if task.long_lived {
            run_long_lived(task.kind, &ctx, &runtime_tx).await
        } else {
            run_task(task.kind, &ctx).await.map(|report| {
                info!(task = %name, run_id, ?report, "task finished");
            })
        }
    };

    let result = tokio::select! {
        result = work => result,
        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => info!(task = %name, run_id, "task instance cancelled"),
                Err(_) => debug!(task = %name, run_id, "cancel channel dropped"),
            }
            return;
        }
    };

    let outcome = match result {
        Ok(()) => TaskOutcome::Success,
        Err(err) => {
            error!(task = %name, run_id, error = %format!("{err:#}"), "task failed");
            TaskOutcome::Fatal(format!("{err:#}"))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %name, run_id, "runtime gone; dropping completion");
    }
}

async fn run_long_lived(
    kind: TaskKind,
    ctx: &BuildContext,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> anyhow::Result<()> {
    match kind {
        TaskKind::Watch => {
            let profiles: Vec<_> = build_profiles_from_config(&ctx.config, ctx.env)?
                .into_iter()
                .filter(|p| ctx.watched_tasks.contains(&p.kind()))
                .collect();
            let _watcher = spawn_watcher(
                ctx.config.src_dir(),
                profiles,
                ctx.sprite_cache.clone(),
                runtime_tx.clone(),
            )?;
            report_progress(kind, runtime_tx).await;
            std::future::pending::<()>().await;
            Ok(())
        }
        TaskKind::Serve => {
            let server = DevServer::bind(ctx).await?;
            report_progress(kind, runtime_tx).await;
            server.run().await
        }
        other => anyhow::bail!("task '{other}' is not long-lived"),
    }
}

async fn report_progress(kind: TaskKind, runtime_tx: &mpsc::Sender<RuntimeEvent>) {
    let _ = runtime_tx
        .send(RuntimeEvent::TaskProgressed {
            task: kind.as_str().to_string(),
        })
        .await;
}
