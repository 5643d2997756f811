// tests/runtime_fake_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout, FakeExecutor};

use std::collections::HashSet;
use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Duration;

use assetpipe::cli::TaskArg;
use assetpipe::dag::{Pipeline, Scheduler};
use assetpipe::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetpipe::errors::AssetpipeError;
use assetpipe::seed_roots;
use assetpipe::tasks::TaskKind;
use assetpipe::types::Env;

type TestResult = Result<(), Box<dyn Error>>;

fn core_for(pipeline: &Pipeline) -> CoreRuntime {
    CoreRuntime::new(
        Scheduler::from_pipeline(pipeline),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: !pipeline.has_long_lived(),
        },
    )
}

fn asset_names() -> HashSet<String> {
    TaskKind::ASSET_TASKS
        .iter()
        .map(|k| k.as_str().to_string())
        .collect()
}

#[tokio::test]
async fn build_runs_clean_first_then_every_asset_task_and_exits() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::build();
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    seed_roots(&pipeline, &tx).await?;
    let runtime = Runtime::new(core_for(&pipeline), rx, executor);

    tokio::time::timeout(Duration::from_secs(2), runtime.run()).await??;

    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 6, "executed: {executed:?}");
    assert_eq!(executed[0], "clean");
    let rest: HashSet<String> = executed[1..].iter().cloned().collect();
    assert_eq!(rest, asset_names());
    Ok(())
}

#[tokio::test]
async fn fatal_task_failure_aborts_build() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::build();
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed)).failing("clean");

    seed_roots(&pipeline, &tx).await?;
    let runtime = Runtime::new(core_for(&pipeline), rx, executor);

    let result = with_timeout(runtime.run()).await;
    match result {
        Err(AssetpipeError::TaskFailed { task, reason }) => {
            assert_eq!(task, "clean");
            assert!(reason.contains("clean failed"));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }

    // Nothing downstream of the failed clean may have started.
    assert_eq!(*executed.lock().unwrap(), vec!["clean".to_string()]);
    Ok(())
}

#[tokio::test]
async fn default_starts_watch_and_serve_after_assets_and_stops_on_shutdown() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::dev_default();
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    seed_roots(&pipeline, &tx).await?;
    let handle = tokio::spawn(Runtime::new(core_for(&pipeline), rx, executor).run());

    with_timeout(async {
        loop {
            if executed.lock().unwrap().len() == 7 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    let executed = executed.lock().unwrap().clone();
    let first_five: HashSet<String> = executed[..5].iter().cloned().collect();
    assert_eq!(first_five, asset_names());
    let last_two: HashSet<&str> = executed[5..].iter().map(String::as_str).collect();
    assert_eq!(last_two, HashSet::from(["watch", "serve"]));
    Ok(())
}

async fn wait_for_executed(executed: &Arc<Mutex<Vec<String>>>, count: usize) {
    with_timeout(async {
        while executed.lock().unwrap().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn standalone_watch_runs_only_the_tasks_whose_sources_change() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::for_task(TaskArg::Watch, Env::Dev);
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    seed_roots(&pipeline, &tx).await?;
    let handle = tokio::spawn(Runtime::new(core_for(&pipeline), rx, executor).run());
    wait_for_executed(&executed, 1).await;

    for task in ["styles", "sprites"] {
        tx.send(RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await?;
    }
    wait_for_executed(&executed, 3).await;

    tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed[0], "watch");
    let rebuilt: HashSet<&str> = executed[1..].iter().map(String::as_str).collect();
    assert_eq!(rebuilt, HashSet::from(["styles", "sprites"]));
    Ok(())
}
