use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

/// One in-process lock per real directory.
///
/// Multi-file sequences (rename + sidecar, remove + sweep, queue commit) hold
/// the lock of the directory they mutate so readers in the same process never
/// observe half of them. Other processes are not coordinated.
///
/// Callers needing several folders go through [`FolderLocks::with_folders`],
/// which always acquires in path order. A directory's entry is dropped once
/// nobody holds or waits for it.
#[derive(Default)]
pub struct FolderLocks {
    locks: Mutex<HashMap<PathBuf, Arc<ReentrantMutex<()>>>>,
}

impl FolderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `folder`.
    pub fn with_folder<T>(&self, folder: &Path, f: impl FnOnce() -> T) -> T {
        self.with_folders([folder], f)
    }

    /// Run `f` while holding the locks of every folder in `folders`.
    pub fn with_folders<'a, T>(
        &self,
        folders: impl IntoIterator<Item = &'a Path>,
        f: impl FnOnce() -> T,
    ) -> T {
        let ordered: BTreeSet<&Path> = folders.into_iter().collect();
        let handles: Vec<Arc<ReentrantMutex<()>>> = {
            let mut locks = self.locks.lock();
            ordered
                .into_iter()
                .map(|folder| {
                    Arc::clone(
                        locks
                            .entry(folder.to_path_buf())
                            .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
                    )
                })
                .collect()
        };

        let result = {
            let _guards: Vec<_> = handles.iter().map(|lock| lock.lock()).collect();
            f()
        };

        drop(handles);
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
        result
    }

    /// Number of directories with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}
