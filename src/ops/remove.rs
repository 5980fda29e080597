use std::path::Path;

use super::{dir_entry_names, file_name, parent_dir, FileOps};
use crate::asset::{derive_related_names, sidecar_name};
use crate::error::MediaError;

/// Names deleted by [`FileOps::remove`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: Vec<String>,
}

impl FileOps {
    /// Delete `name` from `folder` together with its sidecar and retina
    /// variants.
    ///
    /// A missing folder is a no-op. A missing file inside an existing folder
    /// is skipped, but its sidecar and variants are still swept. The sweep
    /// reads the directory afresh and considers every entry, in name order;
    /// the first failing delete aborts it, so a failure can leave later
    /// derivatives behind.
    pub fn remove(&self, name: &str, folder: &str) -> Result<RemoveOutcome, MediaError> {
        let path = self.file_path(folder, name)?;
        let dir = parent_dir(&path).to_path_buf();
        if !dir.is_dir() {
            return Ok(RemoveOutcome::default());
        }

        self.locks.with_folder(&dir, || {
            let mut outcome = RemoveOutcome::default();
            let filename = file_name(&path);

            if path.is_file() {
                delete(&path)?;
                outcome.removed.push(filename.clone());
            }
            self.forget(&path);

            if let Some(sidecar) = self.remove_metadata(&dir, &filename)? {
                self.forget(&dir.join(&sidecar));
                outcome.removed.push(sidecar);
            }

            let names = dir_entry_names(&dir).map_err(|e| MediaError::Delete {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            for derivative in derive_related_names(&filename, &names) {
                let derivative_path = dir.join(&derivative);
                delete(&derivative_path)?;
                self.forget(&derivative_path);
                outcome.removed.push(derivative);
            }

            tracing::debug!(folder, name, files = outcome.removed.len(), "Removed media file");
            Ok(outcome)
        })
    }

    /// Delete the metadata sidecar of `filename` if there is one.
    fn remove_metadata(&self, dir: &Path, filename: &str) -> Result<Option<String>, MediaError> {
        let sidecar = sidecar_name(filename);
        let path = dir.join(&sidecar);
        if !path.is_file() {
            return Ok(None);
        }
        delete(&path)?;
        Ok(Some(sidecar))
    }
}

fn delete(path: &Path) -> Result<(), MediaError> {
    std::fs::remove_file(path).map_err(|e| MediaError::Delete {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
