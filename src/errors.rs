// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Only the variants here escalate to a process-level abort. Step failures,
//! dirty exits and archive noise are handled where they occur and never
//! become a `WildfireError`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WildfireError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Master template not found: {}", .0.display())]
    MissingTemplate(PathBuf),

    #[error("Fire source error: {0}")]
    FireSource(String),

    #[error("{0} is not a valid US state")]
    InvalidState(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WildfireError>;
