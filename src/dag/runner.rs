// src/dag/runner.rs

//! Running task specs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::dag::graph::{TaskGraph, TaskSpec};
use crate::dag::task::{RunReport, Task, TaskRecord};
use crate::errors::{ModbuildError, Result};

pub type RunFuture = Pin<Box<dyn Future<Output = Result<RunReport>> + Send + 'static>>;

impl TaskGraph {
    /// Run `spec` to completion.
    ///
    /// - Series members start only after the previous member finished
    ///   successfully; the first failure is returned and later members never
    ///   start.
    /// - Parallel members run as separate tokio tasks. All of them run to
    ///   completion; one failure is returned as is, several as
    ///   `ParallelFailed`.
    /// - A failing leaf is reported as `TaskFailed { task, source }`.
    pub fn run(self: &Arc<Self>, spec: TaskSpec) -> RunFuture {
        run_spec(Arc::clone(self), spec, Vec::new())
    }

    /// Run a defined task or group by name.
    pub fn run_named(self: &Arc<Self>, name: &str) -> RunFuture {
        self.run(TaskSpec::named(name))
    }
}

fn run_spec(graph: Arc<TaskGraph>, spec: TaskSpec, stack: Vec<String>) -> RunFuture {
    Box::pin(async move {
        match spec {
            TaskSpec::Inline(task) => run_leaf(task).await,
            TaskSpec::Named(name) => {
                if let Some(task) = graph.tasks.get(&name) {
                    return run_leaf(task.clone()).await;
                }
                let Some(group) = graph.groups.get(&name).cloned() else {
                    return Err(ModbuildError::TaskNotFound(name));
                };
                if stack.contains(&name) {
                    return Err(ModbuildError::TaskCycle(format!(
                        "group '{name}' contains itself"
                    )));
                }
                let mut stack = stack;
                stack.push(name);
                run_spec(graph, group, stack).await
            }
            TaskSpec::Series(members) => {
                let mut report = RunReport::default();
                for member in members {
                    let done = run_spec(Arc::clone(&graph), member, stack.clone()).await?;
                    report.merge(done);
                }
                Ok(report)
            }
            TaskSpec::Parallel(members) => run_parallel(graph, members, stack).await,
        }
    })
}

async fn run_parallel(
    graph: Arc<TaskGraph>,
    members: Vec<TaskSpec>,
    stack: Vec<String>,
) -> Result<RunReport> {
    let mut set = JoinSet::new();
    for (index, member) in members.into_iter().enumerate() {
        let fut = run_spec(Arc::clone(&graph), member, stack.clone());
        set.spawn(async move { (index, fut.await) });
    }

    let mut report = RunReport::default();
    let mut failures: Vec<(usize, ModbuildError)> = Vec::new();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(done))) => report.merge(done),
            Ok((index, Err(err))) => failures.push((index, err)),
            Err(join) => failures.push((
                usize::MAX,
                ModbuildError::Other(anyhow!("parallel member panicked: {join}")),
            )),
        }
    }

    failures.sort_by_key(|(index, _)| *index);
    let mut errors: Vec<ModbuildError> = failures.into_iter().map(|(_, e)| e).collect();
    match errors.len() {
        0 => Ok(report),
        1 => Err(errors.remove(0)),
        _ => Err(ModbuildError::ParallelFailed(errors)),
    }
}

async fn run_leaf(task: Task) -> Result<RunReport> {
    let name = task.name().to_string();
    info!(task = %name, "starting task");
    let started = Instant::now();

    match task.start().await {
        Ok(()) => {
            let finished = Instant::now();
            info!(
                task = %name,
                elapsed_ms = finished.duration_since(started).as_millis() as u64,
                "finished task"
            );
            Ok(RunReport::single(TaskRecord {
                task: name,
                started,
                finished,
            }))
        }
        Err(err) => {
            error!(task = %name, error = %err, "task failed");
            Err(ModbuildError::TaskFailed {
                task: name,
                source: Box::new(err),
            })
        }
    }
}
