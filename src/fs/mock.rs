// src/fs/mock.rs

use std::collections::BTreeMap;
use std::io::Cursor;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use super::FileSystem;

/// In-memory filesystem. Directories exist implicitly as ancestors of the
/// files added to it.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Add `count` empty files named `<prefix><n>` under `dir`.
    pub fn add_files(&self, dir: impl AsRef<Path>, prefix: &str, count: usize) {
        for n in 0..count {
            self.add_file(dir.as_ref().join(format!("{prefix}{n:03}")), Vec::new());
        }
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let mut files = self.files.lock().unwrap();
        files.remove(path.as_ref()).is_some()
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        let mut children: Vec<PathBuf> = files
            .keys()
            .filter_map(|file| {
                let rel = file.strip_prefix(path).ok()?;
                let first = rel.components().next()?;
                Some(path.join(first))
            })
            .collect();
        children.dedup();

        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(children)
    }
}
