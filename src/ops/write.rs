use std::path::{Path, PathBuf};

use super::{parent_dir, FileOps};
use crate::error::MediaError;
use crate::upload::UploadHandle;

impl FileOps {
    /// Copy `source` to `target` inside `folder`. Derivatives are not copied.
    ///
    /// Returns the absolute destination path.
    pub fn copy(&self, source: &str, target: &str, folder: &str) -> Result<PathBuf, MediaError> {
        let from = self.file_path(folder, source)?;
        let to = self.file_path(folder, target)?;

        if let Err(e) = std::fs::metadata(&from) {
            return Err(MediaError::Read {
                path: from,
                message: e.to_string(),
            });
        }
        ensure_parent(&to)?;

        std::fs::copy(&from, &to).map_err(|e| MediaError::Write {
            path: to.clone(),
            message: e.to_string(),
        })?;
        self.forget(&to);

        tracing::debug!(folder, source, target, "Copied media file");
        Ok(to)
    }

    /// Move an uploaded file to `target` inside `folder`.
    ///
    /// Returns the absolute destination path.
    pub fn move_upload(
        &self,
        upload: &mut dyn UploadHandle,
        target: &str,
        folder: &str,
    ) -> Result<PathBuf, MediaError> {
        let to = self.file_path(folder, target)?;
        ensure_parent(&to)?;

        upload.move_to(&to)?;
        self.forget(&to);

        tracing::debug!(
            folder,
            target,
            client_filename = upload.client_filename(),
            size = upload.size(),
            "Moved uploaded file"
        );
        Ok(to)
    }
}

fn ensure_parent(path: &Path) -> Result<(), MediaError> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).map_err(|e| MediaError::Write {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })
}
