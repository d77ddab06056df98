// src/dag/task.rs

//! Leaf tasks and run reports.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::Result;

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// A zero-argument unit of work.
///
/// Every call to `run` starts a fresh execution; a task defined once at
/// startup may run any number of times.
pub trait TaskWork: Send + Sync {
    fn run(&self) -> TaskFuture;
}

impl<F, Fut> TaskWork for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self) -> TaskFuture {
        Box::pin(self())
    }
}

/// A named leaf task.
#[derive(Clone)]
pub struct Task {
    name: String,
    work: Arc<dyn TaskWork>,
}

impl Task {
    pub fn new(name: impl Into<String>, work: impl TaskWork + 'static) -> Self {
        Self {
            name: name.into(),
            work: Arc::new(work),
        }
    }

    pub fn from_arc(name: impl Into<String>, work: Arc<dyn TaskWork>) -> Self {
        Self {
            name: name.into(),
            work,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> TaskFuture {
        self.work.run()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish_non_exhaustive()
    }
}

/// One completed leaf task.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task: String,
    pub started: Instant,
    pub finished: Instant,
}

impl TaskRecord {
    pub fn elapsed(&self) -> Duration {
        self.finished.saturating_duration_since(self.started)
    }
}

/// Leaf tasks completed by a successful run, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<TaskRecord>,
}

impl RunReport {
    pub fn single(record: TaskRecord) -> Self {
        Self {
            records: vec![record],
        }
    }

    pub fn merge(&mut self, other: RunReport) {
        self.records.extend(other.records);
    }

    /// Names of completed tasks, in completion order.
    pub fn tasks(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.task.as_str()).collect()
    }

    pub fn record(&self, task: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.task == task)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
