// src/registry/mod.rs

//! Module discovery and the generated module manifest.
//!
//! Layout convention, relative to the source root:
//!
//! ```text
//! modules/
//!   Core/
//!     module.toml        <- descriptor (priority, dependencies, export names)
//!     state.js           <- required
//!     getters.js         <- required when the descriptor declares getters
//!     mutations.js
//!     actions.js
//!     modules/
//!       Users/           <- nested module "Core.Users", depends on "Core"
//! ```
//!
//! - [`descriptor`] parses one module directory.
//! - [`order`] computes the load order.
//! - [`manifest`] holds the manifest types, aggregation and rendering.

pub mod descriptor;
pub mod manifest;
pub mod order;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RegistrySection;
use crate::errors::{ModbuildError, Result};
use crate::fs::FileSystem;

pub use descriptor::{
    is_valid_module_segment, DescriptorFile, ModuleDescriptor, ModuleExports, StoreSection,
    SubExport,
};
pub use manifest::{render_manifest, save_manifest, Aggregate, AggregateEntry, ModuleManifest};

use descriptor::{load_module, ModuleLocation};

/// Per-call discovery options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryOptions {
    /// Log every discovered module at `info` instead of `debug`.
    pub verbose: bool,
}

/// Discovers modules under a source root and writes the manifest.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    fs: Arc<dyn FileSystem>,
    source_root: PathBuf,
    config: RegistrySection,
    output_suffixes: Vec<String>,
}

impl ModuleRegistry {
    pub fn new(fs: Arc<dyn FileSystem>, source_root: impl Into<PathBuf>, config: RegistrySection) -> Self {
        Self {
            fs,
            source_root: source_root.into(),
            config,
            output_suffixes: Vec::new(),
        }
    }

    /// Leave files ending in any of `suffixes` (e.g. `.min.js`) out of module
    /// assets, so build outputs do not change the manifest.
    pub fn with_output_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.output_suffixes = suffixes;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn modules_root(&self) -> PathBuf {
        self.source_root.join(&self.config.modules_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.source_root.join(&self.config.manifest)
    }

    /// Scan the modules directory and build a manifest.
    ///
    /// Malformed modules are skipped with a warning. Key collisions between
    /// modules and dependency cycles are errors.
    pub fn discover(&self, options: &RegistryOptions) -> Result<ModuleManifest> {
        let root = self.modules_root();
        if !self.fs.is_dir(&root) {
            warn!(dir = ?root, "modules directory not found; manifest will be empty");
            return ModuleManifest::from_ordered(Vec::new());
        }

        let mut found = Vec::new();
        self.scan_dir(&root, None, options, &mut found)?;

        let (modules, dropped) = order::drop_unresolved(found);
        for (module, reason) in dropped {
            report_skipped(ModbuildError::Discovery { module, reason });
        }

        let ordered = order::load_order(modules, &self.config.load_order)?;
        let manifest = ModuleManifest::from_ordered(ordered)?;

        let names: Vec<&str> = manifest.module_names().collect();
        if options.verbose {
            info!(count = names.len(), order = ?names, "module discovery finished");
        } else {
            debug!(count = names.len(), order = ?names, "module discovery finished");
        }

        Ok(manifest)
    }

    /// Write the manifest atomically. Returns `false` if the file already
    /// held exactly these bytes.
    pub fn save_manifest(&self, manifest: &ModuleManifest) -> Result<bool> {
        save_manifest(self.fs.as_ref(), manifest, &self.manifest_path())
    }

    /// `discover` followed by `save_manifest`.
    pub fn regenerate(&self, options: &RegistryOptions) -> Result<ModuleManifest> {
        let manifest = self.discover(options)?;
        self.save_manifest(&manifest)?;
        Ok(manifest)
    }

    fn scan_dir(
        &self,
        dir: &Path,
        parent: Option<&str>,
        options: &RegistryOptions,
        found: &mut Vec<ModuleDescriptor>,
    ) -> Result<()> {
        let mut entries = self.fs.read_dir(dir)?;
        entries.retain(|p| self.fs.is_dir(p));
        entries.sort();

        for module_dir in entries {
            let Some(segment) = module_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let name = match parent {
                Some(parent) => format!("{parent}.{segment}"),
                None => segment.to_string(),
            };

            if !is_valid_module_segment(segment) {
                report_skipped(ModbuildError::Discovery {
                    module: name,
                    reason: format!(
                        "directory name '{segment}' must be PascalCase (e.g. 'Billing')"
                    ),
                });
                continue;
            }

            let location = ModuleLocation {
                name: &name,
                parent,
                dir: &module_dir,
                source_root: &self.source_root,
                descriptor_name: &self.config.descriptor,
                nested_dir_name: &self.config.modules_dir,
                output_suffixes: &self.output_suffixes,
            };

            match load_module(self.fs.as_ref(), &location) {
                Ok(module) => {
                    if options.verbose {
                        info!(module = %module.name, path = %module.root_path, "discovered module");
                    } else {
                        debug!(module = %module.name, path = %module.root_path, "discovered module");
                    }
                    found.push(module);
                }
                Err(reason) => report_skipped(ModbuildError::Discovery {
                    module: name.clone(),
                    reason,
                }),
            }

            // Children of a skipped module are dropped later as unresolved.
            let nested = module_dir.join(&self.config.modules_dir);
            if self.fs.is_dir(&nested) {
                self.scan_dir(&nested, Some(&name), options, found)?;
            }
        }

        Ok(())
    }
}

fn report_skipped(err: ModbuildError) {
    warn!("{err}");
}
