// src/config/mod.rs

//! Configuration loading and validation for modbuild.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants the rest of the crate relies on (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    AliasConfig, AssetSection, ConfigFile, DevSection, IconsSection, ProjectSection,
    RawConfigFile, RegistrySection,
};
