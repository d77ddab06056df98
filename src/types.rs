use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a change arrives for a path whose rebuild is still running.
///
/// - `Queue`: remember up to `queue_length` further rebuilds of that path and
///   run them one after another once the current one finishes (default).
/// - `Coalesce`: collapse every change that arrives meanwhile into a single
///   follow-up rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Coalesce,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "coalesce" => Ok(TriggerWhileRunningBehaviour::Coalesce),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"coalesce\")"
            )),
        }
    }
}

/// Mode for storing content hashes of watched files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store hashes in a file (`.modbuild/hashes`).
    File,
    /// Store hashes in memory only (lost on restart).
    #[default]
    Memory,
}

/// When a single-file rebuild in dev mode also regenerates the module manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ManifestPolicy {
    /// After every component or script change.
    #[default]
    Always,
    /// Only when the changed file lives under the modules directory.
    Modules,
    /// Never; the manifest is only rebuilt by a full `build`.
    Never,
}

impl FromStr for ManifestPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(ManifestPolicy::Always),
            "modules" => Ok(ManifestPolicy::Modules),
            "never" => Ok(ManifestPolicy::Never),
            other => Err(format!(
                "invalid manifest_policy: {other} (expected \"always\", \"modules\" or \"never\")"
            )),
        }
    }
}
