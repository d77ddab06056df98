// src/registry/descriptor.rs

//! Per-module descriptors and the sub-export naming convention.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::fs::{collect_files, FileSystem};

/// Store sections a module can export, in the order they are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreSection {
    State,
    Getters,
    Mutations,
    Actions,
}

impl StoreSection {
    pub const ALL: [StoreSection; 4] = [
        StoreSection::State,
        StoreSection::Getters,
        StoreSection::Mutations,
        StoreSection::Actions,
    ];

    /// File stem of the sub-export (`state.js` -> `state`).
    pub fn as_str(self) -> &'static str {
        match self {
            StoreSection::State => "state",
            StoreSection::Getters => "getters",
            StoreSection::Mutations => "mutations",
            StoreSection::Actions => "actions",
        }
    }
}

impl fmt::Display for StoreSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of a module's `module.toml`.
///
/// ```toml
/// priority = 10
/// dependencies = ["Core"]
/// getters = ["billing/invoices"]
/// mutations = ["billing/setInvoices"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorFile {
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub getters: Vec<String>,
    #[serde(default)]
    pub mutations: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Priority of modules whose descriptor does not set one.
pub const DEFAULT_PRIORITY: i64 = 100;

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

impl DescriptorFile {
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn declared(&self, section: StoreSection) -> &[String] {
        match section {
            StoreSection::State => &[],
            StoreSection::Getters => &self.getters,
            StoreSection::Mutations => &self.mutations,
            StoreSection::Actions => &self.actions,
        }
    }
}

/// One sub-export file and the names it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubExport {
    pub source: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleExports {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub getters: Option<SubExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutations: Option<SubExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<SubExport>,
}

impl ModuleExports {
    pub fn section(&self, section: StoreSection) -> Option<&SubExport> {
        match section {
            StoreSection::State => None,
            StoreSection::Getters => self.getters.as_ref(),
            StoreSection::Mutations => self.mutations.as_ref(),
            StoreSection::Actions => self.actions.as_ref(),
        }
    }
}

/// A discovered module. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub name: String,
    /// Module directory relative to the source root, forward slashes.
    pub root_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub priority: i64,
    /// Declared dependencies; a nested module's parent comes first.
    pub dependencies: Vec<String>,
    pub assets: BTreeSet<String>,
    pub exports: ModuleExports,
}

/// A module name segment must be PascalCase ASCII.
pub fn is_valid_module_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Everything `load_module` needs to know about where a module sits.
pub(crate) struct ModuleLocation<'a> {
    pub name: &'a str,
    pub parent: Option<&'a str>,
    pub dir: &'a Path,
    pub source_root: &'a Path,
    pub descriptor_name: &'a str,
    pub nested_dir_name: &'a str,
    /// Suffixes of build outputs (`.min.js`, ...) left out of `assets`.
    pub output_suffixes: &'a [String],
}

/// Build a descriptor for one module directory.
///
/// `Err` carries the human-readable reason the module is malformed.
pub(crate) fn load_module(
    fs: &dyn FileSystem,
    loc: &ModuleLocation<'_>,
) -> std::result::Result<ModuleDescriptor, String> {
    let descriptor_path = loc.dir.join(loc.descriptor_name);
    if !fs.is_file(&descriptor_path) {
        return Err(format!("missing descriptor '{}'", loc.descriptor_name));
    }
    let text = fs
        .read_to_string(&descriptor_path)
        .map_err(|e| format!("unreadable descriptor: {e}"))?;
    let file = DescriptorFile::parse(&text).map_err(|e| format!("invalid descriptor: {e}"))?;

    let children = fs
        .read_dir(loc.dir)
        .map_err(|e| format!("unreadable module directory: {e}"))?;
    let mut sub_files: Vec<(String, String)> = children
        .iter()
        .filter(|p| fs.is_file(p))
        .filter_map(|p| {
            let file_name = p.file_name()?.to_str()?.to_string();
            let stem = file_name.split('.').next()?.to_string();
            Some((stem, relative(loc.source_root, p)))
        })
        .collect();
    sub_files.sort();

    let find = |section: StoreSection| {
        sub_files
            .iter()
            .find(|(stem, _)| stem == section.as_str())
            .map(|(_, rel)| rel.clone())
    };

    let state = find(StoreSection::State)
        .ok_or_else(|| "missing required sub-export 'state'".to_string())?;

    let mut exports = ModuleExports {
        state,
        getters: None,
        mutations: None,
        actions: None,
    };

    for section in [StoreSection::Getters, StoreSection::Mutations, StoreSection::Actions] {
        let names = file.declared(section);
        check_names(section, names)?;
        let sub = match find(section) {
            Some(source) => Some(SubExport {
                source,
                names: names.to_vec(),
            }),
            None if names.is_empty() => None,
            None => {
                return Err(format!(
                    "declares {section} {:?} but has no '{section}' sub-export file",
                    names
                ));
            }
        };
        match section {
            StoreSection::Getters => exports.getters = sub,
            StoreSection::Mutations => exports.mutations = sub,
            StoreSection::Actions => exports.actions = sub,
            StoreSection::State => {}
        }
    }

    let mut dependencies: Vec<String> = Vec::new();
    if let Some(parent) = loc.parent {
        dependencies.push(parent.to_string());
    }
    for dep in file.dependencies {
        if dep == loc.name {
            return Err("module cannot depend on itself".to_string());
        }
        if !dependencies.contains(&dep) {
            dependencies.push(dep);
        }
    }

    let nested_prefix = format!("{}/", loc.nested_dir_name);
    let assets = collect_files(fs, loc.dir, |rel| {
        !rel.starts_with(&nested_prefix)
            && rel != loc.descriptor_name
            && !loc.output_suffixes.iter().any(|s| rel.ends_with(s.as_str()))
    })
    .map_err(|e| format!("unreadable module directory: {e}"))?
    .iter()
    .map(|p| relative(loc.source_root, p))
    .collect();

    Ok(ModuleDescriptor {
        name: loc.name.to_string(),
        root_path: relative(loc.source_root, loc.dir),
        parent: loc.parent.map(str::to_string),
        priority: file.priority,
        dependencies,
        assets,
        exports,
    })
}

fn check_names(section: StoreSection, names: &[String]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(format!("declares an empty {section} name"));
        }
        if !seen.insert(name.as_str()) {
            return Err(format!("declares {section} '{name}' twice"));
        }
    }
    Ok(())
}

/// `path` relative to `base` with forward slashes; falls back to the full path.
pub(crate) fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
