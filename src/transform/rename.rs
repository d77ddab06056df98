// src/transform/rename.rs

use std::path::PathBuf;

use anyhow::anyhow;

use crate::transform::{Artifact, Stage, StageFuture, StageKind};

/// Sets the destination file name by suffix convention.
///
/// The last extension of the destination is replaced: with `extension =
/// "min.js"`, `foo.js` becomes `foo.min.js` and `foo.vue` becomes
/// `foo.min.js`. A configured basename replaces the stem as well.
#[derive(Debug, Clone)]
pub struct Rename {
    extension: String,
    basename: Option<String>,
    dir: Option<PathBuf>,
}

impl Rename {
    /// `extension` without the leading dot.
    pub fn extension(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
            basename: None,
            dir: None,
        }
    }

    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    /// Write into `dir` instead of next to the source.
    pub fn into_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn target(&self, dest: &std::path::Path) -> Option<PathBuf> {
        let stem = match &self.basename {
            Some(basename) => basename.clone(),
            None => dest.file_stem()?.to_string_lossy().into_owned(),
        };
        let file_name = if self.extension.is_empty() {
            stem
        } else {
            format!("{stem}.{}", self.extension)
        };
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => dest.parent().map(PathBuf::from).unwrap_or_default(),
        };
        Some(dir.join(file_name))
    }
}

impl Stage for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn kind(&self) -> StageKind {
        StageKind::Rename
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let target = self
                .target(&artifact.dest_path)
                .ok_or_else(|| anyhow!("destination {:?} has no file name", artifact.dest_path))?;
            Ok(vec![artifact.with_dest(target)])
        })
    }
}
