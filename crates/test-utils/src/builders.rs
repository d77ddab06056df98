#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modbuild::config::{AliasConfig, ConfigFile, IconsSection, RawConfigFile};
use modbuild::fs::FileSystem;
use modbuild::fs::mock::MockFileSystem;
use modbuild::pipeline::Pipeline;
use modbuild::types::{HashStorageMode, ManifestPolicy, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the same defaults an empty `Modbuild.toml` gets.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_alias(mut self, pattern: &str, replacement: &str) -> Self {
        self.config.alias.push(AliasConfig {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        });
        self
    }

    pub fn with_license_header(mut self, header: &str) -> Self {
        self.config.project.license_header = Some(header.to_string());
        self
    }

    pub fn with_load_order(mut self, names: &[&str]) -> Self {
        self.config.registry.load_order = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_manifest(mut self, manifest: &str) -> Self {
        self.config.registry.manifest = manifest.to_string();
        self
    }

    pub fn with_generated(mut self, rel: &str) -> Self {
        self.config.registry.generated.push(rel.to_string());
        self
    }

    pub fn with_icons(mut self, source: &str, dest: &str) -> Self {
        self.config.icons = Some(IconsSection {
            source: PathBuf::from(source),
            dest: PathBuf::from(dest),
        });
        self
    }

    pub fn with_style_compiler(mut self, cmd: &str) -> Self {
        self.config.styles.compiler = Some(cmd.to_string());
        self
    }

    pub fn with_manifest_policy(mut self, policy: ManifestPolicy) -> Self {
        self.config.dev.manifest_policy = policy;
        self
    }

    pub fn with_cache_bust(mut self, val: bool) -> Self {
        self.config.dev.cache_bust = val;
        self
    }

    pub fn with_use_hash(mut self, mode: HashStorageMode) -> Self {
        self.config.dev.use_hash = true;
        self.config.dev.hash_storage_mode = mode;
        self
    }

    pub fn with_queue(mut self, behaviour: TriggerWhileRunningBehaviour, length: usize) -> Self {
        self.config.dev.triggered_while_running_behaviour = behaviour;
        self.config.dev.queue_length = length;
        self
    }

    /// Arbitrary tweak for fields without a dedicated method.
    pub fn with_raw(mut self, f: impl FnOnce(&mut RawConfigFile)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Project root used by [`ProjectBuilder`].
pub const PROJECT_ROOT: &str = "/proj";

/// In-memory project tree rooted at [`PROJECT_ROOT`], source dir `src`.
///
/// ```ignore
/// let project = ProjectBuilder::new()
///     .module("Core", "", &[("state.js", "export default {}")])
///     .file("src/app.js", "import a from './a.js'");
/// ```
pub struct ProjectBuilder {
    fs: MockFileSystem,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        let fs = MockFileSystem::new();
        fs.add_dir(Path::new(PROJECT_ROOT).join("src"));
        Self { fs }
    }

    /// Add a file at `rel` (relative to the project root).
    pub fn file(self, rel: &str, content: &str) -> Self {
        self.fs.add_file(Path::new(PROJECT_ROOT).join(rel), content);
        self
    }

    /// Add a module directory under `src/modules`.
    ///
    /// `path` uses `/` between nesting levels (`"Core/Users"` becomes
    /// `src/modules/Core/modules/Users`). `descriptor` is the `module.toml`
    /// body; `files` are placed inside the module directory.
    pub fn module(self, path: &str, descriptor: &str, files: &[(&str, &str)]) -> Self {
        let dir = module_dir(path);
        self.fs.add_file(dir.join("module.toml"), descriptor);
        for (name, content) in files {
            self.fs.add_file(dir.join(name), *content);
        }
        self
    }

    /// A module with a `state.js` and the given descriptor.
    pub fn simple_module(self, path: &str, descriptor: &str) -> Self {
        self.module(path, descriptor, &[("state.js", "export default {}\n")])
    }

    pub fn fs(&self) -> MockFileSystem {
        self.fs.clone()
    }

    /// Finish with `config`, returning the pipeline and the mock behind it.
    pub fn pipeline(self, config: ConfigFile) -> (Arc<Pipeline>, MockFileSystem) {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let pipeline =
            Pipeline::new(PROJECT_ROOT, config, fs).expect("Failed to build pipeline");
        (Arc::new(pipeline), self.fs)
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute directory of module `path` (see [`ProjectBuilder::module`]).
pub fn module_dir(path: &str) -> PathBuf {
    let mut dir = Path::new(PROJECT_ROOT).join("src/modules");
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            dir.push("modules");
        }
        dir.push(segment);
    }
    dir
}

/// Absolute path of `rel` under the project root.
pub fn project_path(rel: &str) -> PathBuf {
    Path::new(PROJECT_ROOT).join(rel)
}
