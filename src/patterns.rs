// src/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::AssetSection;
use crate::fs::{collect_files, FileSystem};

/// Compiled include/exclude globs of one asset class.
///
/// Patterns are relative to the source directory; callers pass relative,
/// forward-slash paths such as `"modules/Core/store/index.js"` to
/// [`AssetPatterns::matches`].
#[derive(Clone)]
pub struct AssetPatterns {
    name: String,
    include: GlobSet,
    exclude: Option<GlobSet>,
    /// Build outputs (`.min.js`, ...) that match `include` but are not sources.
    skip_suffixes: Vec<String>,
    /// Exact relative paths handled elsewhere (generated sources).
    skip_paths: Vec<String>,
}

impl fmt::Debug for AssetPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetPatterns")
            .field("name", &self.name)
            .field("skip_suffixes", &self.skip_suffixes)
            .field("skip_paths", &self.skip_paths)
            .finish_non_exhaustive()
    }
}

impl AssetPatterns {
    pub fn new(name: impl Into<String>, include: &[String], exclude: &[String]) -> Result<Self> {
        let name = name.into();
        let include = build_globset(include)
            .with_context(|| format!("building include globset for {name}"))?;
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for {name}"))?,
            )
        };
        Ok(Self {
            name,
            include,
            exclude,
            skip_suffixes: Vec::new(),
            skip_paths: Vec::new(),
        })
    }

    pub fn from_section(name: impl Into<String>, section: &AssetSection) -> Result<Self> {
        Self::new(name, &section.include, &section.exclude)
    }

    /// Also reject paths ending in any of `suffixes`.
    pub fn skipping_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_suffixes.extend(suffixes.into_iter().map(Into::into));
        self
    }

    /// Also reject exactly these relative paths.
    pub fn skipping_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        if self.skip_suffixes.iter().any(|s| rel_path.ends_with(s.as_str())) {
            return false;
        }
        !self.skip_paths.iter().any(|p| p == rel_path)
    }

    /// Every file under `root` matching these patterns, sorted.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
        collect_files(fs, root, |rel| self.matches(rel))
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
