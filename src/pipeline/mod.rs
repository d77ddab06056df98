// src/pipeline/mod.rs

//! The concrete asset build, wired from a validated [`ConfigFile`].
//!
//! - [`chains`] assembles the transform chain of each asset class.
//! - [`tasks`] exposes every step as a [`crate::dag::Task`] and defines the
//!   default task graph (`compile`, `icons`, `minify`, `manifest`, `styles`,
//!   `build`).
//!
//! Outputs are written next to their sources (icons go to `[icons].dest`),
//! and only when their bytes change.

pub mod chains;
pub mod tasks;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::alias::AliasTable;
use crate::config::ConfigFile;
use crate::errors::{ModbuildError, Result};
use crate::fs::FileSystem;
use crate::patterns::AssetPatterns;
use crate::registry::{ModuleRegistry, RegistryOptions};
use crate::transform::{Artifact, TransformChain};

pub use tasks::{build_graph, FileScope, BUILD_TASK, DEFAULT_TASKS};

/// Everything needed to build the project's assets.
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    source_root: PathBuf,
    config: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
    aliases: AliasTable,
    registry: ModuleRegistry,
    components: AssetPatterns,
    scripts: AssetPatterns,
    styles: AssetPatterns,
    generated: Vec<String>,
}

impl Pipeline {
    /// `root` is the project root; `[project].source_dir` is resolved
    /// against it.
    pub fn new(root: impl Into<PathBuf>, config: ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let root = root.into();
        let source_root = root.join(&config.project.source_dir);
        let generated = config.generated_sources();

        let component_ext = format!(".{}", config.components.extension);
        let script_ext = format!(".{}", config.scripts.extension);
        let outputs = vec![component_ext, script_ext, ".map".to_string()];

        let components = AssetPatterns::from_section("components", &config.components)?;
        let scripts = AssetPatterns::from_section("scripts", &config.scripts)?
            .skipping_suffixes(outputs.clone())
            .skipping_paths(generated.clone());
        let styles = AssetPatterns::from_section("styles", &config.styles)?;

        let registry = ModuleRegistry::new(Arc::clone(&fs), &source_root, config.registry.clone())
            .with_output_suffixes(outputs);

        Ok(Self {
            aliases: AliasTable::from_config(&config.alias),
            root,
            source_root,
            config: Arc::new(config),
            fs,
            registry,
            components,
            scripts,
            styles,
            generated,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn components(&self) -> &AssetPatterns {
        &self.components
    }

    pub fn scripts(&self) -> &AssetPatterns {
        &self.scripts
    }

    pub fn styles(&self) -> &AssetPatterns {
        &self.styles
    }

    /// Path relative to the source root, forward slashes. `None` for paths
    /// outside it.
    pub fn source_relative(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.source_root)
            .ok()
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
    }

    /// Whether `rel` (source-relative) is a generated source.
    pub fn is_generated(&self, rel: &str) -> bool {
        self.generated.iter().any(|g| g == rel)
    }

    pub fn is_descriptor(&self, rel: &str) -> bool {
        let registry = &self.config.registry;
        rel.starts_with(&format!("{}/", registry.modules_dir))
            && rel.rsplit('/').next() == Some(registry.descriptor.as_str())
    }

    pub fn is_in_modules(&self, rel: &str) -> bool {
        rel.starts_with(&format!("{}/", self.config.registry.modules_dir))
    }

    /// Compile components in `scope`. Returns the number of files written.
    pub async fn compile_components(&self, scope: &FileScope) -> Result<usize> {
        let files = self.files_in_scope(&self.components, scope)?;
        let chain = self.component_chain()?;
        self.run_chain(&chain, files).await
    }

    /// Minify scripts in `scope`. In dev, rewritten imports get the
    /// cache-busting postfix (if enabled).
    pub async fn minify_scripts(&self, scope: &FileScope, dev: bool) -> Result<usize> {
        let files = self.files_in_scope(&self.scripts, scope)?;
        let chain = self.script_chain(dev)?;
        self.run_chain(&chain, files).await
    }

    /// Minify generated sources: all of them, or the single one in scope.
    pub async fn minify_generated(&self, scope: &FileScope) -> Result<usize> {
        let files: Vec<PathBuf> = match scope {
            FileScope::All => self
                .generated
                .iter()
                .map(|rel| self.source_root.join(rel))
                .filter(|p| self.fs.is_file(p))
                .collect(),
            FileScope::Single(path) => match self.source_relative(path) {
                Some(rel) if self.is_generated(&rel) && self.fs.is_file(path) => vec![path.clone()],
                _ => Vec::new(),
            },
        };
        let chain = self.generated_chain()?;
        self.run_chain(&chain, files).await
    }

    /// Rediscover modules and save the manifest. Returns whether the
    /// manifest file changed.
    pub fn regenerate_manifest(&self, options: &RegistryOptions) -> Result<bool> {
        let manifest = self.registry.discover(options)?;
        self.registry.save_manifest(&manifest)
    }

    /// The manifest step of a (scoped) build.
    ///
    /// A generated source in scope is only minified. Anything else
    /// regenerates the manifest and then minifies every generated source.
    pub async fn update_manifest(&self, scope: &FileScope, options: &RegistryOptions) -> Result<usize> {
        if let FileScope::Single(path) = scope {
            if self.source_relative(path).is_some_and(|rel| self.is_generated(&rel)) {
                return self.minify_generated(scope).await;
            }
        }
        self.regenerate_manifest(options)?;
        self.minify_generated(&FileScope::All).await
    }

    /// Compile every stylesheet. Stylesheets import each other, so a change
    /// to one rebuilds all of them.
    pub async fn compile_styles(&self) -> Result<usize> {
        let files = self.styles.collect(self.fs.as_ref(), &self.source_root)?;
        let chain = self.style_chain()?;
        self.run_chain(&chain, files).await
    }

    /// Regenerate the icon module from the icon font's SCSS map. Does nothing
    /// without an `[icons]` section.
    pub async fn build_icons(&self) -> Result<usize> {
        let Some(icons) = &self.config.icons else {
            debug!("no [icons] section; skipping icon extraction");
            return Ok(0);
        };
        let source = self.root.join(&icons.source);
        let chain = self.icon_chain()?;
        self.run_chain(&chain, vec![source]).await
    }

    fn files_in_scope(&self, patterns: &AssetPatterns, scope: &FileScope) -> Result<Vec<PathBuf>> {
        match scope {
            FileScope::All => Ok(patterns.collect(self.fs.as_ref(), &self.source_root)?),
            FileScope::Single(path) => {
                let Some(rel) = self.source_relative(path) else {
                    return Ok(Vec::new());
                };
                if patterns.matches(&rel) && self.fs.is_file(path) {
                    Ok(vec![path.clone()])
                } else {
                    debug!(path = %rel, set = patterns.name(), "path not in asset set; nothing to do");
                    Ok(Vec::new())
                }
            }
        }
    }

    async fn run_chain(&self, chain: &TransformChain, files: Vec<PathBuf>) -> Result<usize> {
        let mut written = 0;
        for path in files {
            let content = self.fs.read_to_string(&path)?;
            let artifacts = chain.run(Artifact::new(&path, content)).await?;
            for artifact in artifacts {
                if self.write_artifact(&artifact)? {
                    written += 1;
                }
            }
        }
        if written > 0 {
            info!(chain = chain.name(), written, "wrote outputs");
        }
        Ok(written)
    }

    /// Write `artifact` (and its source map) unless the destination already
    /// holds the same bytes.
    fn write_artifact(&self, artifact: &Artifact) -> Result<bool> {
        let changed = self.write_if_changed(&artifact.dest_path, &artifact.content)?;
        if let Some(map) = &artifact.source_map {
            let mut map_path = artifact.dest_path.clone().into_os_string();
            map_path.push(".map");
            self.write_if_changed(Path::new(&map_path), map)?;
        }
        Ok(changed)
    }

    fn write_if_changed(&self, dest: &Path, content: &str) -> Result<bool> {
        if self.fs.is_file(dest) {
            if let Ok(existing) = self.fs.read_to_string(dest) {
                if existing == content {
                    debug!(path = ?dest, "output unchanged");
                    return Ok(false);
                }
            }
        }
        self.fs
            .write_atomic(dest, content.as_bytes())
            .map_err(|e| ModbuildError::Write {
                path: dest.to_path_buf(),
                reason: format!("{e:#}"),
            })?;
        debug!(path = ?dest, "wrote output");
        Ok(true)
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
