// src/registry/manifest.rs

use std::collections::HashMap;
use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{ModbuildError, Result};
use crate::fs::FileSystem;
use crate::registry::descriptor::{ModuleDescriptor, StoreSection};

/// Where an aggregated export comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateEntry {
    pub module: String,
    pub source: String,
}

/// Export name -> origin, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    entries: Vec<(String, AggregateEntry)>,
}

impl Aggregate {
    pub fn get(&self, key: &str) -> Option<&AggregateEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Aggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// The canonical description of every module, in load order.
///
/// Two discovery runs over the same tree produce equal manifests and
/// byte-identical renderings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleManifest {
    modules: Vec<ModuleDescriptor>,
    state: Vec<(String, String)>,
    getters: Aggregate,
    mutations: Aggregate,
    actions: Aggregate,
}

impl ModuleManifest {
    /// Build the manifest from modules already in load order, deriving the
    /// aggregates. The same export key in two modules is a `KeyCollision`.
    pub fn from_ordered(modules: Vec<ModuleDescriptor>) -> Result<Self> {
        let state = modules
            .iter()
            .map(|m| (m.name.clone(), m.exports.state.clone()))
            .collect();

        let getters = aggregate(&modules, StoreSection::Getters)?;
        let mutations = aggregate(&modules, StoreSection::Mutations)?;
        let actions = aggregate(&modules, StoreSection::Actions)?;

        Ok(Self {
            modules,
            state,
            getters,
            mutations,
            actions,
        })
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module name -> state file, in load order.
    pub fn state(&self) -> impl Iterator<Item = (&str, &str)> {
        self.state.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Aggregate for `getters`, `mutations` or `actions`.
    ///
    /// `StoreSection::State` has no name-keyed aggregate; use [`Self::state`].
    pub fn aggregate(&self, section: StoreSection) -> Option<&Aggregate> {
        match section {
            StoreSection::State => None,
            StoreSection::Getters => Some(&self.getters),
            StoreSection::Mutations => Some(&self.mutations),
            StoreSection::Actions => Some(&self.actions),
        }
    }
}

fn aggregate(modules: &[ModuleDescriptor], section: StoreSection) -> Result<Aggregate> {
    let mut entries: Vec<(String, AggregateEntry)> = Vec::new();
    let mut owner: HashMap<String, String> = HashMap::new();

    for module in modules {
        let Some(sub) = module.exports.section(section) else {
            continue;
        };
        for key in &sub.names {
            if let Some(first) = owner.get(key) {
                return Err(ModbuildError::KeyCollision {
                    section: section.to_string(),
                    key: key.clone(),
                    first: first.clone(),
                    second: module.name.clone(),
                });
            }
            owner.insert(key.clone(), module.name.clone());
            entries.push((
                key.clone(),
                AggregateEntry {
                    module: module.name.clone(),
                    source: sub.source.clone(),
                },
            ));
        }
    }

    Ok(Aggregate { entries })
}

struct ModulesByName<'a>(&'a [ModuleDescriptor]);

impl Serialize for ModulesByName<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for module in self.0 {
            map.serialize_entry(&module.name, module)?;
        }
        map.end()
    }
}

struct StateByModule<'a>(&'a [(String, String)]);

impl Serialize for StateByModule<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (module, source) in self.0 {
            map.serialize_entry(module, source)?;
        }
        map.end()
    }
}

impl Serialize for ModuleManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("modules", &ModulesByName(&self.modules))?;
        map.serialize_entry("state", &StateByModule(&self.state))?;
        map.serialize_entry("getters", &self.getters)?;
        map.serialize_entry("mutations", &self.mutations)?;
        map.serialize_entry("actions", &self.actions)?;
        map.end()
    }
}

/// Render the manifest for `dest`: an ES module (`export default {...};`)
/// for `.js`, plain JSON otherwise.
pub fn render_manifest(manifest: &ModuleManifest, dest: &Path) -> Result<String> {
    let json = serde_json::to_string_pretty(manifest).map_err(|e| ModbuildError::Write {
        path: dest.to_path_buf(),
        reason: format!("serializing manifest: {e}"),
    })?;

    let is_js = dest.extension().and_then(|e| e.to_str()) == Some("js");
    Ok(if is_js {
        format!("export default {json};\n")
    } else {
        format!("{json}\n")
    })
}

/// Render and atomically write the manifest to `dest`.
///
/// Returns `Ok(false)` without touching the file when it already holds the
/// same bytes.
pub fn save_manifest(fs: &dyn FileSystem, manifest: &ModuleManifest, dest: &Path) -> Result<bool> {
    let rendered = render_manifest(manifest, dest)?;

    if fs.is_file(dest) {
        if let Ok(existing) = fs.read_to_string(dest) {
            if existing == rendered {
                debug!(path = ?dest, "manifest unchanged");
                return Ok(false);
            }
        }
    }

    fs.write_atomic(dest, rendered.as_bytes())
        .map_err(|e| ModbuildError::Write {
            path: dest.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

    info!(path = ?dest, modules = manifest.len(), "wrote module manifest");
    Ok(true)
}
