// src/transform/mod.rs

//! Asset transformation chains.
//!
//! A [`TransformChain`] is an ordered list of [`Stage`]s. Each stage takes an
//! [`Artifact`] by value and returns zero or more new artifacts, which are fed
//! to the next stage. Chains for components, scripts, generated config,
//! styles and icons are assembled from the same stage types:
//!
//! - [`compile`]: component compiler, shell-command filters, passthrough.
//! - [`rewrite`]: alias resolution and shipped-suffix rewriting of imports.
//! - [`minify`]: comment stripping and whitespace collapsing.
//! - [`header`]: idempotent license banner.
//! - [`rename`]: destination suffix convention.
//! - [`icons`]: icon-font SCSS map to JS module.

pub mod compile;
pub mod header;
pub mod icons;
pub mod minify;
pub mod rename;
pub mod rewrite;

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::trace;

use crate::errors::{ModbuildError, Result};

pub use compile::{CommandStage, ComponentCompiler, PassthroughCompiler};
pub use header::HeaderStamp;
pub use icons::IconExtract;
pub use minify::{Minify, MinifyOptions};
pub use rename::Rename;
pub use rewrite::{AliasRewrite, ImportMinOptions};

/// A file moving through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The file the artifact was read from. Stays fixed through the chain.
    pub source_path: PathBuf,
    pub content: String,
    pub source_map: Option<String>,
    /// Where the artifact will be written.
    pub dest_path: PathBuf,
}

impl Artifact {
    /// An artifact whose destination starts out as its source path.
    pub fn new(source_path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let source_path = source_path.into();
        Self {
            dest_path: source_path.clone(),
            source_path,
            content: content.into(),
            source_map: None,
        }
    }

    pub fn with_dest(mut self, dest_path: impl Into<PathBuf>) -> Self {
        self.dest_path = dest_path.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn source(&self) -> &Path {
        &self.source_path
    }
}

/// Position class of a stage; [`ChainBuilder::build`] enforces the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Turns a source format into JavaScript/CSS. Must come first.
    Compile,
    /// Produces an artifact from a non-code source. Must come first.
    Extract,
    Rewrite,
    Minify,
    /// Must come after every minify stage.
    Header,
    /// Must come last.
    Rename,
}

impl StageKind {
    fn slot(self) -> u8 {
        match self {
            StageKind::Compile | StageKind::Extract => 0,
            StageKind::Rewrite | StageKind::Minify | StageKind::Header => 1,
            StageKind::Rename => 2,
        }
    }
}

pub type StageFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<Artifact>>> + Send + 'a>>;

/// One step of a chain.
///
/// Stages are shared between chains and across concurrent rebuilds, so they
/// must not keep per-artifact state.
pub trait Stage: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> StageKind;

    fn apply(&self, artifact: Artifact) -> StageFuture<'_>;
}

/// An ordered, validated list of stages.
#[derive(Debug, Clone)]
pub struct TransformChain {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl TransformChain {
    pub fn builder(name: impl Into<String>) -> ChainBuilder {
        ChainBuilder {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `artifact` through every stage.
    ///
    /// A stage failure becomes `ModbuildError::Transform` naming the source
    /// file and the stage.
    pub async fn run(&self, artifact: Artifact) -> Result<Vec<Artifact>> {
        let mut current = vec![artifact];

        for stage in &self.stages {
            let mut next = Vec::with_capacity(current.len());
            for artifact in current {
                let path = artifact.source_path.clone();
                trace!(chain = %self.name, stage = stage.name(), path = ?path, "applying stage");
                let produced = stage.apply(artifact).await.map_err(|e| ModbuildError::Transform {
                    path,
                    stage: stage.name().to_string(),
                    reason: format!("{e:#}"),
                })?;
                next.extend(produced);
            }
            current = next;
        }

        Ok(current)
    }
}

pub struct ChainBuilder {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl ChainBuilder {
    pub fn stage<S: Stage + 'static>(self, stage: S) -> Self {
        self.shared(Arc::new(stage))
    }

    /// Add a stage instance that is also used by other chains.
    pub fn shared(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Add `stage` only if it is `Some`.
    pub fn maybe<S: Stage + 'static>(self, stage: Option<S>) -> Self {
        match stage {
            Some(stage) => self.stage(stage),
            None => self,
        }
    }

    /// Check stage order:
    ///
    /// - compile/extract stages come before everything else
    /// - rename stages come after everything else
    /// - no minify stage follows a header stage
    pub fn build(self) -> Result<TransformChain> {
        let mut prev: Option<&Arc<dyn Stage>> = None;
        let mut header_seen: Option<&str> = None;

        for stage in &self.stages {
            if let Some(prev) = prev {
                if stage.kind().slot() < prev.kind().slot() {
                    return Err(ModbuildError::ConfigError(format!(
                        "chain '{}': stage '{}' ({:?}) cannot follow stage '{}' ({:?})",
                        self.name,
                        stage.name(),
                        stage.kind(),
                        prev.name(),
                        prev.kind()
                    )));
                }
            }
            match stage.kind() {
                StageKind::Header => header_seen = Some(stage.name()),
                StageKind::Minify => {
                    if let Some(header) = header_seen {
                        return Err(ModbuildError::ConfigError(format!(
                            "chain '{}': minify stage '{}' must run before header stage '{}'",
                            self.name,
                            stage.name(),
                            header
                        )));
                    }
                }
                _ => {}
            }
            prev = Some(stage);
        }

        Ok(TransformChain {
            name: self.name,
            stages: self.stages,
        })
    }
}
