// src/watch/scope.rs

//! Which rebuild steps a single changed path needs.

use std::path::{Path, PathBuf};

use crate::pipeline::Pipeline;
use crate::types::ManifestPolicy;

/// Whether the changed path still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Removed,
}

/// One step of a scoped rebuild. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildStep {
    CompileComponent(PathBuf),
    MinifyScript(PathBuf),
    /// Minify one generated source without regenerating anything.
    MinifyGenerated(PathBuf),
    CompileStyles,
    /// Rediscover modules, save the manifest, minify generated sources.
    RegenerateManifest,
}

/// Steps to run, in order, for one changed path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildPlan {
    pub steps: Vec<RebuildStep>,
}

impl RebuildPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn regenerates_manifest(&self) -> bool {
        self.steps.contains(&RebuildStep::RegenerateManifest)
    }
}

/// Maps a changed source path to the smallest set of steps that brings the
/// outputs up to date.
///
/// | changed path                  | steps                              |
/// |-------------------------------|------------------------------------|
/// | generated source              | minify that file                   |
/// | module descriptor             | manifest                           |
/// | component                     | compile that file (+ manifest)     |
/// | script                        | minify that file (+ manifest)      |
/// | stylesheet                    | compile styles                     |
/// | removed component or script   | (manifest)                         |
///
/// "(manifest)" depends on the [`ManifestPolicy`]. Generated sources never
/// trigger manifest regeneration, so regenerating cannot feed back into
/// itself through the watcher.
#[derive(Debug, Clone, Copy)]
pub struct ScopePolicy {
    manifest: ManifestPolicy,
}

impl ScopePolicy {
    pub fn new(manifest: ManifestPolicy) -> Self {
        Self { manifest }
    }

    pub fn manifest_policy(&self) -> ManifestPolicy {
        self.manifest
    }

    pub fn plan(&self, pipeline: &Pipeline, path: &Path, kind: ChangeKind) -> RebuildPlan {
        let Some(rel) = pipeline.source_relative(path) else {
            return RebuildPlan::default();
        };

        let mut steps = Vec::new();

        if pipeline.is_generated(&rel) {
            if kind == ChangeKind::Modified {
                steps.push(RebuildStep::MinifyGenerated(path.to_path_buf()));
            }
            return RebuildPlan { steps };
        }

        if pipeline.is_descriptor(&rel) {
            steps.push(RebuildStep::RegenerateManifest);
            return RebuildPlan { steps };
        }

        let is_component = pipeline.components().matches(&rel);
        let is_script = pipeline.scripts().matches(&rel);

        if pipeline.styles().matches(&rel) {
            steps.push(RebuildStep::CompileStyles);
        }

        if is_component || is_script {
            if kind == ChangeKind::Modified {
                steps.push(if is_component {
                    RebuildStep::CompileComponent(path.to_path_buf())
                } else {
                    RebuildStep::MinifyScript(path.to_path_buf())
                });
            }
            if self.wants_manifest(pipeline, &rel) {
                steps.push(RebuildStep::RegenerateManifest);
            }
        }

        RebuildPlan { steps }
    }

    fn wants_manifest(&self, pipeline: &Pipeline, rel: &str) -> bool {
        match self.manifest {
            ManifestPolicy::Always => true,
            ManifestPolicy::Modules => pipeline.is_in_modules(rel),
            ManifestPolicy::Never => false,
        }
    }
}
