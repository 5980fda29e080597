use serde::{Deserialize, Serialize};

use crate::asset::{mime_type, split_name};
use crate::error::UploadError;

/// Extensions that are never accepted, whatever a field allows.
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "php", "php3", "php4", "php5", "php7", "phar", "phtml", "pht", "exe", "com", "bat", "cmd",
    "sh", "bash", "js", "mjs", "htm", "html", "shtml", "xhtml", "jsp", "asp", "aspx", "cgi", "pl",
    "py",
];

/// Media configuration of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Target folder: a stream path, or a path relative to the media folder.
    pub destination: Option<String>,
    /// Uploads land directly in the media folder.
    #[serde(rename = "self")]
    pub self_folder: bool,
    /// Per-field size limit in bytes.
    pub filesize_limit: Option<u64>,
    /// MIME patterns (`image/*`), extensions (`.pdf`) or `*`. Empty accepts all.
    pub accept: Vec<String>,
    /// Explicit filename ordering for listings.
    pub order: Vec<String>,
    pub random_name: bool,
    pub avoid_overwriting: bool,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            destination: None,
            self_folder: true,
            filesize_limit: None,
            accept: Vec::new(),
            order: Vec::new(),
            random_name: false,
            avoid_overwriting: false,
        }
    }
}

/// Looks up field settings for a content record.
pub trait Blueprint: Send + Sync {
    fn field_settings(&self, field: &str) -> Option<FieldSettings>;
}

impl FieldSettings {
    pub fn with_destination(destination: &str) -> Self {
        Self {
            destination: Some(destination.to_string()),
            self_folder: false,
            ..Default::default()
        }
    }

    pub fn limit(&self, default_limit: u64) -> u64 {
        self.filesize_limit.unwrap_or(default_limit)
    }

    /// Whether `filename` (with its reported media type) passes the accept list.
    pub fn accepts(&self, filename: &str, media_type: Option<&str>) -> bool {
        if self.accept.is_empty() {
            return true;
        }
        let guessed = mime_type(filename);
        let media_type = media_type
            .filter(|m| *m != "application/octet-stream")
            .unwrap_or(&guessed)
            .to_ascii_lowercase();
        let extension = split_name(filename)
            .1
            .map(|e| format!(".{}", e.to_ascii_lowercase()));

        self.accept.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            if pattern == "*" || pattern == "*/*" {
                true
            } else if pattern.starts_with('.') {
                extension.as_deref() == Some(pattern.as_str())
            } else if let Some(prefix) = pattern.strip_suffix("/*") {
                media_type.split('/').next() == Some(prefix)
            } else {
                media_type == pattern
            }
        })
    }

    /// Check an incoming upload against size and type constraints.
    pub fn validate_upload(
        &self,
        filename: &str,
        size: u64,
        media_type: Option<&str>,
        default_limit: u64,
    ) -> Result<(), UploadError> {
        let filename = check_filename(filename)?;
        let limit = self.limit(default_limit);
        if size > limit {
            return Err(UploadError::TooLarge {
                filename: filename.to_string(),
                limit,
            });
        }
        if !self.accepts(filename, media_type) {
            return Err(UploadError::TypeNotAccepted {
                filename: filename.to_string(),
                media_type: media_type
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_type(filename)),
            });
        }
        Ok(())
    }
}

/// Accept only plain, non-hidden file names with a safe extension.
pub fn check_filename(filename: &str) -> Result<&str, UploadError> {
    let invalid = || UploadError::InvalidFilename(filename.to_string());
    if filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0'])
        || filename.trim() != filename
    {
        return Err(invalid());
    }
    if let (_, Some(ext)) = split_name(filename) {
        if DANGEROUS_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return Err(invalid());
        }
    }
    Ok(filename)
}
