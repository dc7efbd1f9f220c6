// src/archive.rs

//! Output archiver: copies finished simulation output from the scratch
//! workspace into `<archive>/<fire_id>/<day>/<file>`.
//!
//! Files are copied, never moved, so the scan can be repeated. A destination
//! whose size and content hash already match the source is left untouched.
//! Paths that do not have the `<fire_id>/wrf/<day>/<file>` shape are skipped
//! with a warning.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::layout::STATE_DIR;

/// Where an output file belongs in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMetadata {
    pub fire_id: String,
    pub day: String,
    pub file_name: String,
}

/// Derive `(fire_id, day, file_name)` from a path relative to the scratch
/// root. Only `<fire_id>/wrf/<day>/<file>` qualifies.
pub fn extract_metadata(relative: &Path) -> Option<OutputMetadata> {
    let parts: Vec<&str> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [fire_id, "wrf", day, file_name] => Some(OutputMetadata {
            fire_id: fire_id.to_string(),
            day: day.to_string(),
            file_name: file_name.to_string(),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub copied: usize,
    pub unchanged: usize,
    /// Matching files whose path did not have the expected shape.
    pub skipped: usize,
    /// Files that could not be copied.
    pub failed: usize,
}

impl ArchiveReport {
    pub fn print(&self) {
        println!(
            "Archive: {} copied, {} unchanged, {} skipped, {} failed",
            self.copied, self.unchanged, self.skipped, self.failed
        );
    }
}

#[derive(Debug, Clone)]
pub struct OutputArchiver {
    scratch_dir: PathBuf,
    archive_dir: PathBuf,
    prefix: String,
}

impl OutputArchiver {
    pub fn new(
        scratch_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            archive_dir: archive_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Scan the scratch workspace and copy every output file into the
    /// archive. Per-file problems are logged and counted; only the scan
    /// itself can fail.
    pub fn archive(&self) -> Result<ArchiveReport> {
        let mut report = ArchiveReport::default();

        if !self.scratch_dir.is_dir() {
            warn!(dir = ?self.scratch_dir, "scratch directory not found; nothing to archive");
            return Ok(report);
        }

        info!(
            from = ?self.scratch_dir,
            to = ?self.archive_dir,
            prefix = %self.prefix,
            "archiving simulation output"
        );

        let walker = WalkDir::new(&self.scratch_dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "cannot read part of the scratch directory");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !name.starts_with(&self.prefix) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.scratch_dir)
                .context("walked outside the scratch directory")?;

            let Some(meta) = extract_metadata(relative) else {
                warn!(path = ?entry.path(), "output file not under <fire>/wrf/<day>/; skipped");
                report.skipped += 1;
                continue;
            };

            match self.copy_one(entry.path(), &meta) {
                Ok(true) => report.copied += 1,
                Ok(false) => report.unchanged += 1,
                Err(err) => {
                    warn!(path = ?entry.path(), error = %format!("{err:#}"), "failed to archive file");
                    report.failed += 1;
                }
            }
        }

        info!(
            copied = report.copied,
            unchanged = report.unchanged,
            skipped = report.skipped,
            failed = report.failed,
            "archive finished"
        );
        Ok(report)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path == self.archive_dir || path == self.scratch_dir.join(STATE_DIR)
    }

    /// Copy one file. Returns `false` when the destination already held the
    /// same content.
    fn copy_one(&self, source: &Path, meta: &OutputMetadata) -> Result<bool> {
        let dest_dir = self.archive_dir.join(&meta.fire_id).join(&meta.day);
        let dest = dest_dir.join(&meta.file_name);

        if same_content(source, &dest)? {
            debug!(dest = ?dest, "already archived");
            return Ok(false);
        }

        fs::create_dir_all(&dest_dir)
            .with_context(|| format!("creating archive directory {:?}", dest_dir))?;
        fs::copy(source, &dest).with_context(|| format!("copying {:?} to {:?}", source, dest))?;
        debug!(source = ?source, dest = ?dest, "archived");
        Ok(true)
    }
}

fn same_content(source: &Path, dest: &Path) -> Result<bool> {
    let Ok(dest_meta) = fs::metadata(dest) else {
        return Ok(false);
    };
    let source_meta = fs::metadata(source).with_context(|| format!("reading {:?}", source))?;
    if dest_meta.len() != source_meta.len() {
        return Ok(false);
    }
    Ok(file_hash(source)? == file_hash(dest)?)
}

fn file_hash(path: &Path) -> Result<blake3::Hash> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path).with_context(|| format!("opening {:?} for hashing", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
