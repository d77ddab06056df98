// src/lib.rs

pub mod alias;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod patterns;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::dag::{TaskGraph, TaskSpec};
use crate::errors::ModbuildError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{build_graph, Pipeline, BUILD_TASK};
use crate::registry::RegistryOptions;
use crate::watch::{notifier_from_config, spawn_watcher, WatchDispatcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the asset pipeline and its task graph
/// - the target run (`build`, a single task, or `dev`)
/// - in `dev`: file watcher, scoped rebuilds and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    // notify reports absolute paths; they must strip against the source root.
    let root = RealFileSystem.canonicalize(&config_root_dir(&config_path))?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pipeline = Arc::new(Pipeline::new(root, cfg, fs)?);

    let options = RegistryOptions {
        verbose: args.is_dev(),
    };
    let graph = Arc::new(build_graph(&pipeline, options)?);

    if args.dry_run {
        print_dry_run(&pipeline, &graph, options);
        return Ok(());
    }

    if args.is_dev() {
        return run_dev(pipeline, graph).await;
    }

    if !graph.contains(&args.target) {
        return Err(ModbuildError::TaskNotFound(args.target.clone()).into());
    }
    let report = graph.run_named(&args.target).await?;
    info!(target = %args.target, tasks = report.len(), "done");
    Ok(())
}

/// Full build, then watch the source directory until Ctrl-C.
async fn run_dev(pipeline: Arc<Pipeline>, graph: Arc<TaskGraph>) -> Result<()> {
    graph.run_named(BUILD_TASK).await?;

    let notifier = notifier_from_config(&pipeline.config().dev);
    let dispatcher = Arc::new(WatchDispatcher::new(
        Arc::clone(&pipeline),
        Arc::clone(&graph),
        notifier,
    ));
    let _watcher = spawn_watcher(pipeline.source_root().to_path_buf(), dispatcher)?;

    info!("watching for changes; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("shutting down");
    Ok(())
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "web/Modbuild.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Modbuild.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the resolved config, task graph and module load order.
fn print_dry_run(pipeline: &Pipeline, graph: &TaskGraph, options: RegistryOptions) {
    let cfg = pipeline.config();
    println!("modbuild dry-run");
    println!("  root = {}", pipeline.root().display());
    println!("  source_root = {}", pipeline.source_root().display());
    println!("  aliases = {}", cfg.alias.len());
    for rule in pipeline.aliases().rules() {
        println!("    {} -> {}", rule.pattern, rule.replacement);
    }
    println!("  dev.manifest_policy = {:?}", cfg.dev.manifest_policy);
    println!(
        "  dev.triggered_while_running_behaviour = {:?}",
        cfg.dev.triggered_while_running_behaviour
    );
    println!();

    let names = graph.names();
    println!("tasks ({}):", names.len());
    for name in names {
        match graph.group(name) {
            Some(spec) => println!("  - {name} = {}", describe(spec)),
            None => println!("  - {name}"),
        }
    }
    println!();

    match pipeline.registry().discover(&options) {
        Ok(manifest) => {
            println!("modules ({}):", manifest.len());
            for module in manifest.modules() {
                println!("  - {} ({})", module.name, module.root_path);
                if !module.dependencies.is_empty() {
                    println!("      depends on: {:?}", module.dependencies);
                }
            }
        }
        Err(err) => println!("modules: discovery failed: {err}"),
    }

    debug!("dry-run complete (nothing written)");
}

fn describe(spec: &TaskSpec) -> String {
    let join = |members: &[TaskSpec]| {
        members.iter().map(describe).collect::<Vec<_>>().join(", ")
    };
    match spec {
        TaskSpec::Named(name) => name.clone(),
        TaskSpec::Series(members) => format!("series({})", join(members)),
        TaskSpec::Parallel(members) => format!("parallel({})", join(members)),
        TaskSpec::Inline(task) => task.name().to_string(),
    }
}
