//! File operations on a media file and its derivative family.
//!
//! Every operation takes a file name and the folder it lives in. Folders may
//! be stream paths (`user://pages/blog`) or webroot-relative paths.
//!
//! Multi-step operations are not transactional. Once the primary file has
//! been changed, a failing follow-up step is reported but nothing is rolled
//! back.

mod lock;
mod read;
mod remove;
mod rename;
mod sanitize;
mod write;

pub use lock::FolderLocks;
pub use remove::RemoveOutcome;
pub use rename::RenameOutcome;
pub use sanitize::{SanitizeError, Sanitizer, SvgHushSanitizer};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::MediaError;
use crate::resolver::{Intent, PathResolver};

pub struct FileOps {
    resolver: Arc<PathResolver>,
    sanitizer: Arc<dyn Sanitizer>,
    locks: FolderLocks,
}

impl FileOps {
    pub fn new(resolver: Arc<PathResolver>, sanitizer: Arc<dyn Sanitizer>) -> Self {
        Self {
            resolver,
            sanitizer,
            locks: FolderLocks::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<PathResolver> {
        &self.resolver
    }

    pub fn locks(&self) -> &FolderLocks {
        &self.locks
    }

    /// Absolute directory for `folder`, fabricated when it does not exist yet.
    pub(crate) fn folder_dir(&self, folder: &str) -> Result<PathBuf, MediaError> {
        self.resolver
            .resolve_absolute(folder, Intent::Create)?
            .ok_or_else(|| MediaError::BadDestination {
                destination: folder.to_string(),
            })
    }

    /// Absolute path of `name` inside `folder`.
    ///
    /// `name` may contain sub-directories but may not leave the webroot.
    pub(crate) fn file_path(&self, folder: &str, name: &str) -> Result<PathBuf, MediaError> {
        let dir = self.folder_dir(folder)?;
        let joined = dir.join(name);
        self.resolver
            .relative(&joined)
            .map(|rel| self.resolver.absolute(&rel))
            .ok_or_else(|| MediaError::BadDestination {
                destination: joined.display().to_string(),
            })
    }

    /// Drop stream lookups that may point at `path` after a mutation.
    fn forget(&self, path: &Path) {
        self.resolver.forget(path);
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Names in `dir`, skipping sub-directories.
fn dir_file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}

/// Every entry name in `dir`.
fn dir_entry_names(dir: &Path) -> std::io::Result<Vec<String>> {
    std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
        .collect()
}
