// src/watch/mod.rs

//! File watching and incremental rebuilds.
//!
//! This module is responsible for:
//! - Mapping a changed path to the minimal rebuild steps (`scope`).
//! - Serialising rebuilds per path (`queue`).
//! - (Optionally) skipping rebuilds whose content hash is unchanged (`hash`).
//! - Running the steps and signalling reload (`dispatcher`, `reload`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).

pub mod dispatcher;
pub mod hash;
pub mod path_utils;
pub mod queue;
pub mod reload;
pub mod scope;
pub mod watcher;

pub use dispatcher::{DispatchOutcome, WatchDispatcher};
pub use hash::{compute_file_hash, FileHashStore, HashStore, MemoryHashStore, HASH_FILE_PATH};
pub use queue::{Admission, ChangeQueue};
pub use reload::{
    notifier_from_config, ChannelNotifier, CommandNotifier, LogNotifier, ReloadNotifier,
};
pub use scope::{ChangeKind, RebuildPlan, RebuildStep, ScopePolicy};
pub use watcher::{spawn_watcher, WatcherHandle};
