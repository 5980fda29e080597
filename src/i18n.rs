//! User-facing message lookup. Only the HTTP layer uses this.

use std::collections::HashMap;

pub trait Translator: Send + Sync {
    /// Message for `key`, or the key itself when unknown.
    fn translate(&self, key: &str) -> String;
}

/// In-memory message catalog.
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: &str, message: &str) {
        self.messages.insert(key.to_string(), message.to_string());
    }

    /// English messages for every media error key.
    pub fn english() -> Self {
        let mut catalog = Self::new();
        for (key, message) in [
            ("MEDIA.ERROR.UNRESOLVED_STREAM", "The media location could not be resolved"),
            ("MEDIA.ERROR.READ", "The file could not be read"),
            ("MEDIA.ERROR.WRITE", "The file could not be written"),
            ("MEDIA.ERROR.CONFLICT", "A file with that name already exists"),
            ("MEDIA.ERROR.RENAME", "The file could not be renamed"),
            ("MEDIA.ERROR.METADATA_RENAME", "The file was renamed but its metadata was not"),
            ("MEDIA.ERROR.DERIVATIVE_RENAME", "The file was renamed but some of its variants were not"),
            ("MEDIA.ERROR.DELETE", "The file could not be deleted"),
            ("MEDIA.ERROR.NOT_FOUND", "The file does not exist"),
            ("MEDIA.ERROR.BAD_DESTINATION", "There is no folder to upload this file to"),
            ("MEDIA.ERROR.TOO_LARGE", "The file is too large"),
            ("MEDIA.ERROR.BAD_TYPE", "This type of file is not accepted"),
            ("MEDIA.ERROR.BAD_FILENAME", "The file name is not allowed"),
            ("MEDIA.ERROR.UPLOAD", "The upload could not be stored"),
            ("MEDIA.ERROR.SANITIZE", "The SVG file could not be sanitized"),
        ] {
            catalog.insert(key, message);
        }
        catalog
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::english()
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
