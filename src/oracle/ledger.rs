// src/oracle/ledger.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::plan::Step;

/// Ledger key for a step: `<fire_id>/geogrid` or `<fire_id>/<day>`.
pub fn ledger_key(step: &Step) -> String {
    format!("{}/{}", step.fire_id, step.display_name())
}

/// Record of steps whose output was observed complete, with the artifact
/// count seen at the time.
pub trait CompletionLedger: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<usize>>;
    fn save(&mut self, key: &str, count: usize) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<bool>;
}

/// Stores entries in a text file, one `key count` pair per line.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CompletionLedger for FileLedger {
    fn load(&self, key: &str) -> Result<Option<usize>> {
        let map = load_entries(&self.path)?;
        Ok(map.get(key).copied())
    }

    fn save(&mut self, key: &str, count: usize) -> Result<()> {
        let mut map = load_entries(&self.path)?;
        if map.get(key) == Some(&count) {
            return Ok(());
        }
        map.insert(key.to_string(), count);
        save_entries(&self.path, &map)?;
        debug!(key, count, "recorded completed step (file)");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let mut map = load_entries(&self.path)?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        save_entries(&self.path, &map)?;
        info!(key, "pruned stale ledger entry (file)");
        Ok(true)
    }
}

/// Keeps entries for the lifetime of the run only.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    map: BTreeMap<String, usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionLedger for MemoryLedger {
    fn load(&self, key: &str) -> Result<Option<usize>> {
        Ok(self.map.get(key).copied())
    }

    fn save(&mut self, key: &str, count: usize) -> Result<()> {
        self.map.insert(key.to_string(), count);
        debug!(key, count, "recorded completed step (memory)");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let removed = self.map.remove(key).is_some();
        if removed {
            info!(key, "pruned stale ledger entry (memory)");
        }
        Ok(removed)
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, usize>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let file = File::open(path).with_context(|| format!("opening ledger at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut map = BTreeMap::new();
    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        // Unparseable lines are dropped; the next save rewrites the file.
        if let Some((key, count)) = trimmed.rsplit_once(char::is_whitespace)
            && let Ok(count) = count.parse()
        {
            map.insert(key.trim().to_string(), count);
        }
    }

    Ok(map)
}

fn save_entries(path: &Path, map: &BTreeMap<String, usize>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating ledger directory at {:?}", parent))?;
    }

    let file = File::create(path).with_context(|| format!("creating ledger at {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for (key, count) in map {
        writeln!(writer, "{} {}", key, count)?;
    }
    writer.flush()?;
    Ok(())
}
