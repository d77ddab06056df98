// src/watch/queue.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::TriggerWhileRunningBehaviour;

/// What the caller of [`ChangeQueue::admit`] should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Nothing is running for this path: start a rebuild now.
    Start,
    /// A rebuild of this path is in flight; the change was recorded and the
    /// in-flight owner will rebuild again when it finishes.
    Queued,
}

/// Serialises rebuilds per path.
///
/// At most one rebuild of a given path runs at a time. Changes arriving
/// meanwhile are remembered as follow-up runs:
///
/// - `Queue`: each change adds one follow-up, up to `max_runs`; extra
///   changes beyond that are dropped (the newest follow-up still sees the
///   latest file content).
/// - `Coalesce`: any number of changes collapse into a single follow-up.
///
/// Different paths never wait for each other.
#[derive(Debug)]
pub struct ChangeQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    running: HashSet<String>,
    pending: HashMap<String, usize>,
}

impl ChangeQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            running: HashSet::new(),
            pending: HashMap::new(),
        }
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    pub fn is_running(&self, path: &str) -> bool {
        self.running.contains(path)
    }

    /// Follow-up runs recorded for `path`.
    pub fn pending(&self, path: &str) -> usize {
        self.pending.get(path).copied().unwrap_or(0)
    }

    pub fn admit(&mut self, path: &str) -> Admission {
        if self.running.insert(path.to_string()) {
            return Admission::Start;
        }

        let count = self.pending.entry(path.to_string()).or_insert(0);
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if *count < self.max_runs {
                    *count += 1;
                    debug!(path = %path, queued = *count, "queued follow-up rebuild");
                } else {
                    warn!(
                        path = %path,
                        max_runs = self.max_runs,
                        "rebuild queue full; dropping change"
                    );
                }
            }
            TriggerWhileRunningBehaviour::Coalesce => {
                *count = 1;
                debug!(path = %path, "coalesced change into pending rebuild");
            }
        }
        Admission::Queued
    }

    /// Called by the owner when a rebuild of `path` finished.
    ///
    /// Returns `true` if a follow-up is pending; the caller keeps ownership
    /// and must rebuild again. Returns `false` once the path is idle.
    pub fn finish(&mut self, path: &str) -> bool {
        match self.pending.get_mut(path) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(path);
                }
                true
            }
            _ => {
                self.pending.remove(path);
                self.running.remove(path);
                false
            }
        }
    }
}
