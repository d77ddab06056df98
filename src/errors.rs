// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModbuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A module directory violates the layout or naming convention.
    ///
    /// Discovery never returns this from `discover`; it is logged and the
    /// module is skipped.
    #[error("module '{module}' skipped: {reason}")]
    Discovery { module: String, reason: String },

    #[error("stage '{stage}' failed on {}: {reason}", .path.display())]
    Transform {
        path: PathBuf,
        stage: String,
        reason: String,
    },

    #[error("failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("{section} key '{key}' is declared by both module '{first}' and module '{second}'")]
    KeyCollision {
        section: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("module dependency cycle between: {}", .0.join(", "))]
    ModuleCycle(Vec<String>),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<ModbuildError>,
    },

    #[error("{} parallel task(s) failed: {}", .0.len(), join_errors(.0))]
    ParallelFailed(Vec<ModbuildError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ModbuildError {
    /// Name of the leaf task that failed, if this error came out of a task run.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            ModbuildError::TaskFailed { task, .. } => Some(task),
            ModbuildError::ParallelFailed(errors) => errors.iter().find_map(|e| e.failed_task()),
            _ => None,
        }
    }

    /// Innermost error, skipping `TaskFailed` wrappers.
    pub fn root_cause(&self) -> &ModbuildError {
        match self {
            ModbuildError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn join_errors(errors: &[ModbuildError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ModbuildError>;
