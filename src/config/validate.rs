// src/config/validate.rs

use std::collections::HashSet;

use globset::Glob;

use crate::config::model::{AssetSection, ConfigFile, RawConfigFile};
use crate::errors::{ModbuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ModbuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_project(cfg)?;
    validate_aliases(cfg)?;
    validate_asset_section("components", &cfg.components)?;
    validate_asset_section("scripts", &cfg.scripts)?;
    validate_asset_section("styles", &cfg.styles)?;
    validate_suffixes(cfg)?;
    validate_registry(cfg)?;
    validate_dev(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> ModbuildError {
    ModbuildError::ConfigError(msg.into())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.source_dir.as_os_str().is_empty() {
        return Err(config_error("[project].source_dir must not be empty"));
    }
    Ok(())
}

fn validate_aliases(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, rule) in cfg.alias.iter().enumerate() {
        if rule.pattern.is_empty() {
            return Err(config_error(format!(
                "[[alias]] entry #{} has an empty pattern",
                idx + 1
            )));
        }
        if !seen.insert(rule.pattern.as_str()) {
            return Err(config_error(format!(
                "[[alias]] pattern '{}' is declared more than once",
                rule.pattern
            )));
        }
    }
    Ok(())
}

fn validate_asset_section(section: &str, asset: &AssetSection) -> Result<()> {
    if asset.extension.is_empty() {
        return Err(config_error(format!(
            "[{section}].extension must be set (e.g. \"min.js\")"
        )));
    }
    if asset.extension.starts_with('.') {
        return Err(config_error(format!(
            "[{section}].extension must not start with a dot (got '{}')",
            asset.extension
        )));
    }
    for pattern in asset.include.iter().chain(asset.exclude.iter()) {
        Glob::new(pattern).map_err(|e| {
            config_error(format!("[{section}] invalid glob pattern '{pattern}': {e}"))
        })?;
    }
    if let Some(cmd) = &asset.compiler {
        if cmd.trim().is_empty() {
            return Err(config_error(format!(
                "[{section}].compiler must not be an empty command"
            )));
        }
    }
    Ok(())
}

fn validate_suffixes(cfg: &RawConfigFile) -> Result<()> {
    // Consumers tell compiled components from minified scripts by suffix.
    if cfg.components.extension == cfg.scripts.extension {
        return Err(config_error(format!(
            "[components].extension and [scripts].extension must differ (both are '{}')",
            cfg.scripts.extension
        )));
    }
    Ok(())
}

fn validate_registry(cfg: &RawConfigFile) -> Result<()> {
    let registry = &cfg.registry;

    if registry.modules_dir.trim().is_empty() {
        return Err(config_error("[registry].modules_dir must not be empty"));
    }
    if registry.descriptor.trim().is_empty() {
        return Err(config_error("[registry].descriptor must not be empty"));
    }
    if !(registry.manifest.ends_with(".js") || registry.manifest.ends_with(".json")) {
        return Err(config_error(format!(
            "[registry].manifest must end in .js or .json (got '{}')",
            registry.manifest
        )));
    }

    let mut seen = HashSet::new();
    for name in registry.load_order.iter() {
        if !seen.insert(name.as_str()) {
            return Err(config_error(format!(
                "[registry].load_order lists module '{name}' more than once"
            )));
        }
    }
    Ok(())
}

fn validate_dev(cfg: &RawConfigFile) -> Result<()> {
    if cfg.dev.queue_length == 0 {
        return Err(config_error("[dev].queue_length must be >= 1 (got 0)"));
    }
    if let Some(cmd) = &cfg.dev.reload_command {
        if cmd.trim().is_empty() {
            return Err(config_error("[dev].reload_command must not be empty"));
        }
    }
    Ok(())
}
