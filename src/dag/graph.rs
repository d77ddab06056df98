// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::{Task, TaskWork};
use crate::errors::{ModbuildError, Result};

/// What to run: a defined name, a composition, or an ad-hoc task.
#[derive(Debug, Clone)]
pub enum TaskSpec {
    /// A task or group defined on the graph.
    Named(String),
    /// Members run one after another; the first failure stops the series.
    Series(Vec<TaskSpec>),
    /// Members run concurrently; all run to completion.
    Parallel(Vec<TaskSpec>),
    /// A task built on demand (per-file rebuilds).
    Inline(Task),
}

impl TaskSpec {
    pub fn named(name: impl Into<String>) -> Self {
        TaskSpec::Named(name.into())
    }

    fn references(&self, out: &mut Vec<String>) {
        match self {
            TaskSpec::Named(name) => out.push(name.clone()),
            TaskSpec::Series(members) | TaskSpec::Parallel(members) => {
                for member in members {
                    member.references(out);
                }
            }
            TaskSpec::Inline(_) => {}
        }
    }
}

impl From<Task> for TaskSpec {
    fn from(task: Task) -> Self {
        TaskSpec::Inline(task)
    }
}

/// `series(["vue", "min"])`
pub fn series<I, S>(names: I) -> TaskSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TaskSpec::Series(names.into_iter().map(TaskSpec::named).collect())
}

/// `parallel(["icons", "styles"])`
pub fn parallel<I, S>(names: I) -> TaskSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TaskSpec::Parallel(names.into_iter().map(TaskSpec::named).collect())
}

/// Named tasks and groups.
///
/// Definitions happen once at startup; [`TaskGraph::run`] (in
/// [`crate::dag::runner`]) may then be called any number of times.
#[derive(Debug, Default)]
pub struct TaskGraph {
    pub(crate) tasks: HashMap<String, Task>,
    pub(crate) groups: HashMap<String, TaskSpec>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a leaf task. Names are shared between tasks and groups.
    pub fn define_task(&mut self, name: impl Into<String>, work: impl TaskWork + 'static) -> Result<()> {
        self.add_task(Task::new(name, work))
    }

    /// Define an already constructed leaf task under its own name.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        self.ensure_free(task.name())?;
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    /// Define a named series/parallel group.
    pub fn define_group(&mut self, name: impl Into<String>, group: TaskSpec) -> Result<()> {
        let name = name.into();
        self.ensure_free(&name)?;
        self.groups.insert(name, group);
        Ok(())
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ModbuildError::ConfigError("task name cannot be empty".to_string()));
        }
        if self.contains(name) {
            return Err(ModbuildError::ConfigError(format!(
                "task or group '{name}' is already defined"
            )));
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.groups.contains_key(name)
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// All defined names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tasks
            .keys()
            .chain(self.groups.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn group(&self, name: &str) -> Option<&TaskSpec> {
        self.groups.get(name)
    }

    /// Check that every referenced name is defined and groups do not
    /// contain themselves.
    pub fn validate(&self) -> Result<()> {
        // Edge direction: group -> member.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.tasks.keys().chain(self.groups.keys()) {
            graph.add_node(name.as_str());
        }

        let mut group_names: Vec<&String> = self.groups.keys().collect();
        group_names.sort();
        for group in group_names {
            let mut refs = Vec::new();
            self.groups[group].references(&mut refs);
            for reference in refs {
                let Some(member) = self
                    .tasks
                    .keys()
                    .chain(self.groups.keys())
                    .find(|k| **k == reference)
                else {
                    return Err(ModbuildError::TaskNotFound(format!(
                        "{reference} (referenced by group '{group}')"
                    )));
                };
                graph.add_edge(group.as_str(), member.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(ModbuildError::TaskCycle(format!(
                "group '{}' contains itself",
                cycle.node_id()
            ))),
        }
    }
}
