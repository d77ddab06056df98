// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info};

use crate::watch::dispatcher::{DispatchOutcome, WatchDispatcher};

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `dir` recursively and hand every changed path to `dispatcher`.
///
/// Each path is dispatched on its own tokio task, so a slow rebuild of one
/// file never delays another. Failures are logged by the dispatcher.
pub fn spawn_watcher(dir: impl Into<PathBuf>, dispatcher: Arc<WatchDispatcher>) -> Result<WatcherHandle> {
    let dir = dir.into();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("modbuild: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("modbuild: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", dir);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    match dispatcher.on_source_change(&path).await {
                        Ok(DispatchOutcome::Ignored) => {}
                        Ok(outcome) => debug!(?path, ?outcome, "change handled"),
                        Err(err) => debug!(?path, error = %err, "change handling failed"),
                    }
                });
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
