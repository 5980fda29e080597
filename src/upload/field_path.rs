use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Replaces `.` in nested field names and `/` in file paths.
pub const SEGMENT_SEPARATOR: char = '\u{1f}';
/// Separates the field part from the file part.
pub const FIELD_FILE_SEPARATOR: char = '\u{1e}';

/// Which field a staged file belongs to, and where the file goes.
///
/// `field` is a dot path (`header.hero`), `file` a `/`-separated path
/// relative to the media folder (`images/logo.png`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath {
    pub field: String,
    pub file: String,
}

impl FieldPath {
    pub fn new(field: &str, file: &str) -> Result<Self, UploadError> {
        let reserved = |s: &str| s.contains([SEGMENT_SEPARATOR, FIELD_FILE_SEPARATOR]);
        if field.is_empty() || reserved(field) || reserved(file) {
            return Err(UploadError::InvalidFilename(format!("{field}:{file}")));
        }
        Ok(Self {
            field: field.to_string(),
            file: file.to_string(),
        })
    }

    /// Flat key used to hold the staged file in a record's property tree.
    pub fn encode(&self) -> String {
        let field = self.field.replace('.', &SEGMENT_SEPARATOR.to_string());
        let file = self.file.replace('/', &SEGMENT_SEPARATOR.to_string());
        format!("{field}{FIELD_FILE_SEPARATOR}{file}")
    }

    pub fn decode(key: &str) -> Option<Self> {
        let (field, file) = key.split_once(FIELD_FILE_SEPARATOR)?;
        if field.is_empty() || file.contains(FIELD_FILE_SEPARATOR) {
            return None;
        }
        Some(Self {
            field: field.replace(SEGMENT_SEPARATOR, "."),
            file: file.replace(SEGMENT_SEPARATOR, "/"),
        })
    }

    /// Last segment of the file part.
    pub fn filename(&self) -> &str {
        self.file.rsplit('/').next().unwrap_or(&self.file)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.file)
    }
}
