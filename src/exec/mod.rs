// src/exec/mod.rs

//! External process execution.
//!
//! Compilers configured as shell commands (`[components] compiler`,
//! `[styles] compiler`) and the dev reload command run through here, using
//! `tokio::process::Command`.

pub mod command;

pub use command::{run_command, run_filter, shell};
