use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{HashStorageMode, ManifestPolicy, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// source_dir = "src"
/// license_header = "/* MIT */"
///
/// [[alias]]
/// pattern = "/?store/"
/// replacement = "/src/store/"
///
/// [registry]
/// load_order = ["Core"]
///
/// [dev]
/// manifest_policy = "modules"
/// reload_command = "browser-sync reload --files {path}"
/// ```
///
/// Every section is optional and has reasonable defaults. Deserialize into
/// this type, then convert with `ConfigFile::try_from` to get a validated
/// configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    /// Ordered alias table from `[[alias]]` entries.
    #[serde(default)]
    pub alias: Vec<AliasConfig>,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default = "AssetSection::components")]
    pub components: AssetSection,

    #[serde(default = "AssetSection::scripts")]
    pub scripts: AssetSection,

    #[serde(default = "AssetSection::styles")]
    pub styles: AssetSection,

    #[serde(default)]
    pub icons: Option<IconsSection>,

    #[serde(default)]
    pub dev: DevSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            project: ProjectSection::default(),
            alias: Vec::new(),
            registry: RegistrySection::default(),
            components: AssetSection::components(),
            scripts: AssetSection::scripts(),
            styles: AssetSection::styles(),
            icons: None,
            dev: DevSection::default(),
        }
    }
}

/// Validated configuration.
///
/// Built through `TryFrom<RawConfigFile>`; globs compile and suffixes are
/// distinct.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub alias: Vec<AliasConfig>,
    pub registry: RegistrySection,
    pub components: AssetSection,
    pub scripts: AssetSection,
    pub styles: AssetSection,
    pub icons: Option<IconsSection>,
    pub dev: DevSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            alias: raw.alias,
            registry: raw.registry,
            components: raw.components,
            scripts: raw.scripts,
            styles: raw.styles,
            icons: raw.icons,
            dev: raw.dev,
        }
    }

    /// Every generated source the manifest task minifies, relative to the
    /// source directory. The manifest itself always comes first.
    pub fn generated_sources(&self) -> Vec<String> {
        let mut out = vec![self.registry.manifest.clone()];
        for extra in &self.registry.generated {
            if !out.contains(extra) {
                out.push(extra.clone());
            }
        }
        out
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Source directory, relative to the project root.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Banner prepended verbatim to every emitted script. A trailing newline
    /// is added if missing. No banner when `None`.
    #[serde(default)]
    pub license_header: Option<String>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            license_header: None,
        }
    }
}

impl ProjectSection {
    /// The banner with its trailing newline, if configured.
    pub fn banner(&self) -> Option<String> {
        self.license_header.as_ref().map(|h| {
            if h.ends_with('\n') {
                h.clone()
            } else {
                format!("{h}\n")
            }
        })
    }
}

/// One `[[alias]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AliasConfig {
    pub pattern: String,
    pub replacement: String,
}

/// `[registry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySection {
    /// Directory (under the source dir) holding one sub-directory per module.
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Per-module descriptor file name.
    #[serde(default = "default_descriptor")]
    pub descriptor: String,

    /// Modules that always load first, in this order.
    #[serde(default)]
    pub load_order: Vec<String>,

    /// Manifest path, relative to the source dir.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Further generated sources (relative to the source dir) that the
    /// manifest task minifies alongside the manifest.
    #[serde(default)]
    pub generated: Vec<String>,
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

fn default_descriptor() -> String {
    "module.toml".to_string()
}

fn default_manifest() -> String {
    "statics/modules.js".to_string()
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            modules_dir: default_modules_dir(),
            descriptor: default_descriptor(),
            load_order: Vec::new(),
            manifest: default_manifest(),
            generated: Vec::new(),
        }
    }
}

/// `[components]`, `[scripts]` and `[styles]` sections.
///
/// Globs are relative to the source dir.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSection {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Extension of emitted files, without the leading dot. Must be given
    /// whenever the section is written out.
    #[serde(default)]
    pub extension: String,

    /// External compiler command (reads stdin, writes stdout).
    #[serde(default)]
    pub compiler: Option<String>,
}

impl AssetSection {
    pub fn components() -> Self {
        Self {
            include: vec!["**/*.vue".to_string()],
            exclude: Vec::new(),
            extension: "vue.js".to_string(),
            compiler: None,
        }
    }

    pub fn scripts() -> Self {
        Self {
            include: vec!["**/*.js".to_string()],
            exclude: Vec::new(),
            extension: "min.js".to_string(),
            compiler: None,
        }
    }

    pub fn styles() -> Self {
        Self {
            include: vec!["css/**/*.styl".to_string()],
            exclude: Vec::new(),
            extension: "css".to_string(),
            compiler: None,
        }
    }
}

/// `[icons]` section. Paths are relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct IconsSection {
    /// SCSS variables file of the icon font.
    pub source: PathBuf,
    /// Emitted JS module.
    pub dest: PathBuf,
}

/// `[dev]` section: incremental rebuild behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct DevSection {
    #[serde(default)]
    pub manifest_policy: ManifestPolicy,

    /// Shell command run after each successful rebuild. `{path}` is replaced
    /// with the changed path.
    #[serde(default)]
    pub reload_command: Option<String>,

    /// Append `?dev=<millis>` to rewritten imports of single-file rebuilds.
    #[serde(default = "default_true")]
    pub cache_bust: bool,

    /// Skip rebuilds when the changed file's content hash is unchanged.
    #[serde(default)]
    pub use_hash: bool,

    #[serde(default)]
    pub hash_storage_mode: HashStorageMode,

    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued follow-up rebuilds per path.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_queue_length() -> usize {
    1
}

impl Default for DevSection {
    fn default() -> Self {
        Self {
            manifest_policy: ManifestPolicy::default(),
            reload_command: None,
            cache_bust: true,
            use_hash: false,
            hash_storage_mode: HashStorageMode::default(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}
