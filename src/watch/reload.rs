// src/watch/reload.rs

//! Reload signals sent after a successful rebuild.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::DevSection;
use crate::exec::run_command;

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Receives the changed path once its rebuild completed successfully.
pub trait ReloadNotifier: Send + Sync + Debug {
    fn notify<'a>(&'a self, path: &'a str) -> NotifyFuture<'a>;
}

/// Only logs.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl ReloadNotifier for LogNotifier {
    fn notify<'a>(&'a self, path: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            info!(path = %path, "rebuild done; reload");
            Ok(())
        })
    }
}

/// Runs a shell command; `{path}` is replaced with the quoted changed path.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: String,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn render(&self, path: &str) -> String {
        self.command.replace("{path}", &shell_quote(path))
    }
}

impl ReloadNotifier for CommandNotifier {
    fn notify<'a>(&'a self, path: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move { run_command(&self.render(path)).await })
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Sends the path over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReloadNotifier for ChannelNotifier {
    fn notify<'a>(&'a self, path: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            self.tx
                .send(path.to_string())
                .map_err(|_| anyhow!("reload channel closed"))
        })
    }
}

/// `CommandNotifier` when `[dev].reload_command` is set, `LogNotifier` otherwise.
pub fn notifier_from_config(dev: &DevSection) -> Arc<dyn ReloadNotifier> {
    match &dev.reload_command {
        Some(cmd) => Arc::new(CommandNotifier::new(cmd.clone())),
        None => Arc::new(LogNotifier),
    }
}
