// src/dag/mod.rs

//! Named tasks and their series/parallel composition.
//!
//! - [`task`] holds leaf tasks (`Task`, `TaskWork`) and `RunReport`.
//! - [`graph`] holds the `TaskGraph` definitions and `TaskSpec`.
//! - [`runner`] executes a `TaskSpec` against a graph.

pub mod graph;
pub mod runner;
pub mod task;

pub use graph::{parallel, series, TaskGraph, TaskSpec};
pub use runner::RunFuture;
pub use task::{RunReport, Task, TaskFuture, TaskRecord, TaskWork};
