use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// A file received by the upload transport, movable exactly once.
pub trait UploadHandle: Send + fmt::Debug {
    /// The name the client sent.
    fn client_filename(&self) -> &str;
    fn size(&self) -> u64;
    fn media_type(&self) -> Option<&str>;
    fn is_moved(&self) -> bool;

    /// Move the uploaded bytes to `target`. A second call fails with
    /// [`UploadError::AlreadyMoved`].
    fn move_to(&mut self, target: &Path) -> Result<(), UploadError>;

    fn meta(&self) -> UploadMeta {
        UploadMeta {
            client_filename: self.client_filename().to_string(),
            size: self.size(),
            media_type: self.media_type().map(str::to_string),
        }
    }
}

/// Serializable description of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMeta {
    pub client_filename: String,
    pub size: u64,
    pub media_type: Option<String>,
}

/// Upload buffered in a temporary file.
///
/// The temporary file is removed on drop unless it was moved.
#[derive(Debug)]
pub struct TempUpload {
    temp_path: Option<PathBuf>,
    client_filename: String,
    size: u64,
    media_type: Option<String>,
}

impl TempUpload {
    /// Wrap an existing temporary file.
    pub fn new<P: Into<PathBuf>>(
        temp_path: P,
        client_filename: &str,
        media_type: Option<&str>,
    ) -> std::io::Result<Self> {
        let temp_path = temp_path.into();
        let size = std::fs::metadata(&temp_path)?.len();
        Ok(Self {
            temp_path: Some(temp_path),
            client_filename: client_filename.to_string(),
            size,
            media_type: media_type.map(str::to_string),
        })
    }

    /// Spool `data` into a fresh file under `dir`.
    pub fn from_bytes<P: AsRef<Path>>(
        dir: P,
        client_filename: &str,
        media_type: Option<&str>,
        data: &[u8],
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        let temp_path = dir.as_ref().join(uuid::Uuid::new_v4().to_string());
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        Self::new(temp_path, client_filename, media_type)
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }
}

impl UploadHandle for TempUpload {
    fn client_filename(&self) -> &str {
        &self.client_filename
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    fn is_moved(&self) -> bool {
        self.temp_path.is_none()
    }

    fn move_to(&mut self, target: &Path) -> Result<(), UploadError> {
        let source = self
            .temp_path
            .as_deref()
            .ok_or_else(|| UploadError::AlreadyMoved(self.client_filename.clone()))?;

        let io_error = |e: std::io::Error| UploadError::Io {
            path: target.to_path_buf(),
            message: e.to_string(),
        };

        // rename fails across filesystems; fall back to copy + unlink
        if std::fs::rename(source, target).is_err() {
            std::fs::copy(source, target).map_err(io_error)?;
            std::fs::remove_file(source).map_err(io_error)?;
        }

        self.temp_path = None;
        Ok(())
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Some(path) = self.temp_path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Failed to reclaim temporary upload");
            }
        }
    }
}
