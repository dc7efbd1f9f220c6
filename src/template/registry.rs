// src/template/registry.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::Result;

/// Everything the materializer wrote during this run, keyed by fire.
///
/// Owned by the top-level run and handed to [`ArtifactRegistry::cleanup`]
/// at shutdown when the operator asks for it.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    entries: BTreeMap<String, BTreeSet<PathBuf>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fire_id: &str, path: impl Into<PathBuf>) {
        self.entries
            .entry(fire_id.to_string())
            .or_default()
            .insert(path.into());
    }

    pub fn fire_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn paths_for(&self, fire_id: &str) -> Vec<&Path> {
        self.entries
            .get(fire_id)
            .map(|paths| paths.iter().map(PathBuf::as_path).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every recorded path. Paths that are already gone are ignored.
    ///
    /// Returns the number of paths actually removed.
    pub fn cleanup(self) -> Result<usize> {
        let mut removed = 0;
        for (fire_id, paths) in self.entries {
            for path in paths {
                let result = if path.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                match result {
                    Ok(()) => {
                        debug!(fire_id = %fire_id, path = %path.display(), "removed artifact");
                        removed += 1;
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        info!(removed, "cleaned up materialized configs");
        Ok(removed)
    }
}
