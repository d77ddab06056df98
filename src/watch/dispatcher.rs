// src/watch/dispatcher.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::dag::{TaskGraph, TaskSpec};
use crate::errors::{ModbuildError, Result};
use crate::pipeline::{FileScope, Pipeline};
use crate::registry::RegistryOptions;
use crate::types::HashStorageMode;
use crate::watch::hash::{compute_file_hash, FileHashStore, HashStore, MemoryHashStore};
use crate::watch::path_utils::{normalize_separators, relative_str};
use crate::watch::queue::{Admission, ChangeQueue};
use crate::watch::reload::ReloadNotifier;
use crate::watch::scope::{ChangeKind, RebuildPlan, RebuildStep, ScopePolicy};

/// Result of one [`WatchDispatcher::on_source_change`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The path is not a source of any build step.
    Ignored,
    /// Content hash unchanged since the last rebuild.
    Skipped,
    /// A rebuild of this path is running; the change was queued behind it.
    Queued,
    /// This call ran `runs` rebuilds (the first plus any queued follow-ups).
    Rebuilt { runs: usize },
}

/// Turns source changes into scoped rebuilds followed by a reload signal.
pub struct WatchDispatcher {
    pipeline: Arc<Pipeline>,
    graph: Arc<TaskGraph>,
    policy: ScopePolicy,
    queue: Mutex<ChangeQueue>,
    hashes: Option<Mutex<Box<dyn HashStore>>>,
    notifier: Arc<dyn ReloadNotifier>,
}

impl std::fmt::Debug for WatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchDispatcher")
            .field("policy", &self.policy)
            .field("use_hash", &self.hashes.is_some())
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl WatchDispatcher {
    /// Build a dispatcher from the pipeline's `[dev]` settings.
    pub fn new(
        pipeline: Arc<Pipeline>,
        graph: Arc<TaskGraph>,
        notifier: Arc<dyn ReloadNotifier>,
    ) -> Self {
        let dev = &pipeline.config().dev;
        let policy = ScopePolicy::new(dev.manifest_policy);
        let queue = ChangeQueue::new(dev.triggered_while_running_behaviour, dev.queue_length);

        let hashes = dev.use_hash.then(|| {
            let store: Box<dyn HashStore> = match dev.hash_storage_mode {
                HashStorageMode::File => Box::new(FileHashStore::new(
                    pipeline.root().to_path_buf(),
                    Arc::clone(pipeline.fs()),
                )),
                HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
            };
            Mutex::new(store)
        });

        Self {
            pipeline,
            graph,
            policy,
            queue: Mutex::new(queue),
            hashes,
            notifier,
        }
    }

    pub fn with_policy(mut self, policy: ScopePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// Absolute, forward-slash form of `path`; relative paths are taken
    /// against the project root.
    fn absolute(&self, path: &Path) -> PathBuf {
        let normalized = PathBuf::from(normalize_separators(&path.to_string_lossy()));
        if normalized.is_absolute() {
            normalized
        } else {
            self.pipeline.root().join(normalized)
        }
    }

    /// Plan the rebuild for `path` without running anything.
    pub fn plan(&self, path: &Path) -> RebuildPlan {
        let abs = self.absolute(path);
        let kind = self.change_kind(&abs);
        self.policy.plan(&self.pipeline, &abs, kind)
    }

    fn change_kind(&self, abs: &Path) -> ChangeKind {
        if self.pipeline.fs().is_file(abs) {
            ChangeKind::Modified
        } else {
            ChangeKind::Removed
        }
    }

    /// Handle one changed path.
    ///
    /// Runs the planned steps in series, then notifies the reload channel.
    /// Changes to the same path while its rebuild runs are queued behind it
    /// and handled by this call; other paths proceed concurrently. A failed
    /// rebuild is logged with its path, task and stage, produces no reload
    /// signal, and is returned once any queued follow-ups have run. Its
    /// content hash is dropped, so the next change retries the rebuild.
    pub async fn on_source_change(&self, path: &Path) -> Result<DispatchOutcome> {
        let abs = self.absolute(path);
        let rel = relative_str(self.pipeline.root(), &abs)
            .unwrap_or_else(|| abs.to_string_lossy().into_owned());

        if self.plan(&abs).is_empty() {
            debug!(path = %rel, "change does not affect any build step");
            return Ok(DispatchOutcome::Ignored);
        }

        if self.content_unchanged(&abs, &rel) {
            info!(path = %rel, "content unchanged; skipping rebuild");
            return Ok(DispatchOutcome::Skipped);
        }

        match self.lock_queue()?.admit(&rel) {
            Admission::Start => {}
            Admission::Queued => return Ok(DispatchOutcome::Queued),
        }

        let mut runs = 0;
        let mut last_error = None;
        loop {
            runs += 1;
            // Re-plan every run: the file may have been deleted meanwhile.
            let plan = self.plan(&abs);
            match self.rebuild(&rel, plan).await {
                Ok(()) => last_error = None,
                Err(err) => {
                    // The same bytes must rebuild again once the cause is fixed.
                    self.forget_hash(&rel);
                    last_error = Some(err);
                }
            }

            if !self.lock_queue()?.finish(&rel) {
                break;
            }
            debug!(path = %rel, "running queued follow-up rebuild");
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(DispatchOutcome::Rebuilt { runs }),
        }
    }

    async fn rebuild(&self, rel: &str, plan: RebuildPlan) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let steps: Vec<TaskSpec> = plan
            .steps
            .iter()
            .map(|step| TaskSpec::Inline(self.task_for(step)))
            .collect();

        info!(path = %rel, steps = steps.len(), "rebuilding");
        match self.graph.run(TaskSpec::Series(steps)).await {
            Ok(report) => {
                info!(path = %rel, tasks = ?report.tasks(), "rebuild finished");
                if let Err(err) = self.notifier.notify(rel).await {
                    warn!(path = %rel, error = %format!("{err:#}"), "reload notification failed");
                }
                Ok(())
            }
            Err(err) => {
                let stage = match err.root_cause() {
                    ModbuildError::Transform { stage, .. } => stage.as_str(),
                    _ => "-",
                };
                error!(
                    path = %rel,
                    task = err.failed_task().unwrap_or("-"),
                    stage,
                    error = %err,
                    "rebuild failed"
                );
                Err(err)
            }
        }
    }

    fn task_for(&self, step: &RebuildStep) -> crate::dag::Task {
        let pipeline = &self.pipeline;
        match step {
            RebuildStep::CompileComponent(path) => {
                pipeline.compile_task(FileScope::Single(path.clone()))
            }
            RebuildStep::MinifyScript(path) => {
                pipeline.minify_task(FileScope::Single(path.clone()), true)
            }
            RebuildStep::MinifyGenerated(path) => {
                pipeline.minify_generated_task(FileScope::Single(path.clone()))
            }
            RebuildStep::CompileStyles => pipeline.styles_task(),
            RebuildStep::RegenerateManifest => {
                pipeline.manifest_task(FileScope::All, RegistryOptions::default())
            }
        }
    }

    /// Compare against the stored hash and record the new one. Any hashing
    /// problem counts as "changed".
    fn content_unchanged(&self, abs: &Path, rel: &str) -> bool {
        let Some(hashes) = &self.hashes else {
            return false;
        };
        let Ok(mut store) = hashes.lock() else {
            warn!("hash store mutex poisoned; rebuilding anyway");
            return false;
        };

        if !self.pipeline.fs().is_file(abs) {
            if let Err(err) = store.remove(rel) {
                warn!(path = %rel, error = %err, "failed to drop content hash");
            }
            return false;
        }

        let hash = match compute_file_hash(self.pipeline.fs().as_ref(), abs) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(path = %rel, error = %err, "failed to hash file; rebuilding anyway");
                return false;
            }
        };

        match store.load(rel) {
            Ok(Some(old)) if old == hash => true,
            Ok(_) => {
                if let Err(err) = store.save(rel, &hash) {
                    warn!(path = %rel, error = %err, "failed to save content hash");
                }
                false
            }
            Err(err) => {
                warn!(path = %rel, error = %err, "failed to load content hash; rebuilding anyway");
                false
            }
        }
    }

    fn forget_hash(&self, rel: &str) {
        let Some(hashes) = &self.hashes else {
            return;
        };
        match hashes.lock() {
            Ok(mut store) => {
                if let Err(err) = store.remove(rel) {
                    warn!(path = %rel, error = %err, "failed to drop content hash");
                }
            }
            Err(_) => warn!("hash store mutex poisoned; content hash kept"),
        }
    }

    fn lock_queue(&self) -> Result<std::sync::MutexGuard<'_, ChangeQueue>> {
        self.queue
            .lock()
            .map_err(|_| ModbuildError::Other(anyhow!("change queue mutex poisoned")))
    }
}
