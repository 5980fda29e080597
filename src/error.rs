use std::path::PathBuf;

use thiserror::Error;

use crate::ops::SanitizeError;

/// Errors raised by the media lifecycle core.
///
/// Variants carry the paths involved and the OS message of the failing call.
/// Rendering for end users goes through [`MediaError::translation_key`].
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unresolved stream path: {path}")]
    UnresolvedStream { path: String },
    #[error("Failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("Failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
    #[error("Cannot rename {} to {}: target already exists", from.display(), to.display())]
    Conflict { from: PathBuf, to: PathBuf },
    #[error("Failed to rename {} to {}: {message}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
    /// The primary file was renamed; only its sidecar failed.
    #[error("Renamed file but failed to rename metadata {} to {}: {message}", from.display(), to.display())]
    MetadataRename {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
    /// The primary file was renamed; one of its retina variants was not.
    #[error("Renamed file but failed to rename variant {} to {}: {message}", from.display(), to.display())]
    DerivativeRename {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
    #[error("Failed to delete {}: {message}", path.display())]
    Delete { path: PathBuf, message: String },
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("No destination folder for '{destination}'")]
    BadDestination { destination: String },
    #[error("Failed to commit staged change for {key}: {source}")]
    Commit {
        key: String,
        #[source]
        source: Box<MediaError>,
    },
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
}

/// Validation and transport failures for uploaded files.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{filename} exceeds the upload limit of {limit} bytes")]
    TooLarge { filename: String, limit: u64 },
    #[error("{filename} has a type that is not accepted ({media_type})")]
    TypeNotAccepted { filename: String, media_type: String },
    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),
    /// Programmer error: an upload handle can only be moved once.
    #[error("Upload {0} was already moved")]
    AlreadyMoved(String),
    #[error("Failed to move upload to {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl MediaError {
    /// Key used to look up the user-facing message for this error.
    pub fn translation_key(&self) -> &'static str {
        match self {
            MediaError::UnresolvedStream { .. } => "MEDIA.ERROR.UNRESOLVED_STREAM",
            MediaError::Read { .. } => "MEDIA.ERROR.READ",
            MediaError::Write { .. } => "MEDIA.ERROR.WRITE",
            MediaError::Conflict { .. } => "MEDIA.ERROR.CONFLICT",
            MediaError::Rename { .. } => "MEDIA.ERROR.RENAME",
            MediaError::MetadataRename { .. } => "MEDIA.ERROR.METADATA_RENAME",
            MediaError::DerivativeRename { .. } => "MEDIA.ERROR.DERIVATIVE_RENAME",
            MediaError::Delete { .. } => "MEDIA.ERROR.DELETE",
            MediaError::NotFound { .. } => "MEDIA.ERROR.NOT_FOUND",
            MediaError::BadDestination { .. } => "MEDIA.ERROR.BAD_DESTINATION",
            MediaError::Commit { source, .. } => source.translation_key(),
            MediaError::Upload(e) => match e {
                UploadError::TooLarge { .. } => "MEDIA.ERROR.TOO_LARGE",
                UploadError::TypeNotAccepted { .. } => "MEDIA.ERROR.BAD_TYPE",
                UploadError::InvalidFilename(_) => "MEDIA.ERROR.BAD_FILENAME",
                UploadError::AlreadyMoved(_) | UploadError::Io { .. } => "MEDIA.ERROR.UPLOAD",
            },
            MediaError::Sanitize(_) => "MEDIA.ERROR.SANITIZE",
        }
    }

    /// True when the operation changed the filesystem before failing.
    pub fn is_partial(&self) -> bool {
        match self {
            MediaError::MetadataRename { .. } | MediaError::DerivativeRename { .. } => true,
            MediaError::Commit { source, .. } => source.is_partial(),
            _ => false,
        }
    }
}
