// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod serve;
pub mod tasks;
pub mod types;
pub mod watch;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, TaskArg};
use crate::config::{load_or_default, CategoryConfig, ConfigFile};
use crate::dag::{Pipeline, Scheduler};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::Result;
use crate::exec::RealExecutorBackend;
use crate::fs::RealFileSystem;
use crate::tasks::{BuildContext, TaskKind};
use crate::types::Env;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, resolves the pipeline for the requested task, builds
/// the [`BuildContext`] and drives the runtime until the pipeline finishes,
/// fails fatally, or Ctrl-C is pressed.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;
    let env = effective_env(args.task, args.prod, cfg.env);
    let pipeline = Pipeline::for_task(args.task, env);
    let order = pipeline.validate()?;

    if args.dry_run {
        print_dry_run(&pipeline, &order, &cfg, env);
        return Ok(());
    }

    let cfg = Arc::new(cfg);
    let notifier = notifier::from_config(cfg.notify.command.as_deref());
    let ctx = BuildContext::new(env, Arc::clone(&cfg), Arc::new(RealFileSystem), notifier)
        .with_watched_tasks(pipeline.watched_tasks());
    info!(pipeline = pipeline.name(), %env, "starting pipeline");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(ctx, rt_tx.clone());

    let shutdown_tx = rt_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(RuntimeEvent::ShutdownRequested).await;
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
        }
    });

    seed_roots(&pipeline, &rt_tx).await?;

    let core = CoreRuntime::new(
        Scheduler::from_pipeline(&pipeline),
        cfg.runtime.triggered_while_running_behaviour,
        cfg.runtime.queue_length,
        RuntimeOptions {
            exit_when_idle: !pipeline.has_long_lived(),
        },
    );

    Runtime::new(core, rt_rx, executor).run().await
}

/// `build` and `--prod` select production; otherwise the configured env.
pub fn effective_env(task: TaskArg, prod_flag: bool, configured: Env) -> Env {
    if task == TaskArg::Build || prod_flag {
        Env::Prod
    } else {
        configured
    }
}

/// Trigger every root of `pipeline`.
pub async fn seed_roots(pipeline: &Pipeline, rt_tx: &mpsc::Sender<RuntimeEvent>) -> Result<()> {
    let roots = pipeline.roots();
    info!(?roots, "initial pipeline roots to trigger at startup");

    for kind in roots {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task: kind.as_str().to_string(),
                reason: TriggerReason::Manual,
            })
            .await
            .map_err(anyhow::Error::from)?;
    }
    Ok(())
}

fn print_dry_run(pipeline: &Pipeline, order: &[TaskKind], cfg: &ConfigFile, env: Env) {
    println!("assetpipe dry-run");
    println!("  pipeline = {}", pipeline.name());
    println!("  env = {env}");
    println!(
        "  order = {}",
        order.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(" -> ")
    );
    println!();

    println!("tasks ({}):", pipeline.nodes().len());
    for node in pipeline.nodes() {
        println!("  - {}", node.kind);
        if !node.after.is_empty() {
            let after: Vec<_> = node.after.iter().map(|k| k.as_str()).collect();
            println!("      after: {after:?}");
        }
        if node.kind.is_long_lived() {
            println!("      long_lived: true");
        }
    }
    println!();

    println!("paths:");
    println!("  src = {}", cfg.src_dir().display());
    println!("  dst = {}", cfg.dst_dir().display());
    let categories: [(&str, &CategoryConfig); 6] = [
        ("templates", &cfg.templates),
        ("js", &cfg.js.paths),
        ("css", &cfg.css.paths),
        ("images", &cfg.images.paths),
        ("files", &cfg.files),
        ("sprites", &cfg.sprites.paths),
    ];
    for (name, category) in categories {
        let src: Vec<_> = category.src.iter().collect();
        println!(
            "  {name}: {src:?} -> {}",
            cfg.category_dst(category).display()
        );
    }

    debug!("dry-run complete (no execution)");
}
