use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::paths;

/// A local file standing in for a remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEntry<'a> {
    pub path: &'a Path,
    pub album: &'a str,
}

/// Every file currently under the sync root, keyed by path, with the album
/// its folder implies. Rebuilt from scratch on every run.
#[derive(Debug, Default)]
pub struct LocalInventory {
    files: HashMap<PathBuf, String>,
    /// File name -> paths carrying it, sorted.
    by_name: HashMap<OsString, Vec<PathBuf>>,
}

impl LocalInventory {
    /// Walk `root` recursively. A missing root yields an empty inventory;
    /// unreadable entries are logged and left out.
    pub fn scan(root: &Path) -> Self {
        if !root.exists() {
            tracing::info!("{} does not exist yet, nothing local to compare", root.display());
            return Self::default();
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(album) = paths::local_album(root, entry.path()) {
                files.push((entry.into_path(), album));
            }
        }

        let inventory: Self = files.into_iter().collect();
        tracing::debug!("Found {} local files under {}", inventory.len(), root.display());
        inventory
    }

    /// The local copy of whatever belongs at `target`: the file at `target`
    /// itself, or else a file with the same name in another folder (the
    /// first by path order when there are several).
    pub fn find(&self, target: &Path) -> Option<LocalEntry<'_>> {
        if let Some((path, album)) = self.files.get_key_value(target) {
            return Some(LocalEntry { path, album });
        }
        let path = self.by_name.get(target.file_name()?)?.first()?;
        let album = self.files.get(path)?;
        Some(LocalEntry { path, album })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(PathBuf, String)> for LocalInventory {
    fn from_iter<I: IntoIterator<Item = (PathBuf, String)>>(iter: I) -> Self {
        let files: HashMap<PathBuf, String> = iter.into_iter().collect();
        let mut by_name: HashMap<OsString, Vec<PathBuf>> = HashMap::new();
        for path in files.keys() {
            if let Some(name) = path.file_name() {
                by_name.entry(name.to_os_string()).or_default().push(path.clone());
            }
        }
        for paths in by_name.values_mut() {
            paths.sort();
        }
        Self { files, by_name }
    }
}
