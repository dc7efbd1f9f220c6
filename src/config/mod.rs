// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: `RawConfigFile` -> `ConfigFile` checks and path
//!   resolution.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ArchiveSection, CompletionSection, ConfigFile, DiagnosticsSection, DiagnosticsSettings,
    DispatchSection, DispatchSettings, LimitsSection, PathsSection, RawConfigFile,
    ScriptsSection,
};
pub use validate::parse_duration;
