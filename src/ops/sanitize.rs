use std::path::Path;

use svg_hush::{data_url_filter, Filter};
use thiserror::Error;

use super::FileOps;
use crate::error::MediaError;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SVG filter failed for {path}: {message}")]
    Filter { path: String, message: String },
}

/// Cleans a file in place.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, path: &Path) -> Result<(), SanitizeError>;
}

/// Strips scripts, event handlers and external references from SVG files.
#[derive(Debug, Default)]
pub struct SvgHushSanitizer;

impl Sanitizer for SvgHushSanitizer {
    fn sanitize(&self, path: &Path) -> Result<(), SanitizeError> {
        let data = std::fs::read(path)?;
        let mut input = data.as_slice();
        let mut out = Vec::with_capacity(data.len());

        let mut filter = Filter::new();
        filter.set_data_url_filter(data_url_filter::allow_standard_images);
        filter
            .filter(&mut input, &mut out)
            .map_err(|e| SanitizeError::Filter {
                path: path.display().to_string(),
                message: format!("{e:?}"),
            })?;

        std::fs::write(path, out)?;
        Ok(())
    }
}

impl FileOps {
    /// Sanitize an SVG in place. Sanitizer errors are passed through as-is.
    pub fn sanitize_svg(&self, name: &str, folder: &str) -> Result<(), MediaError> {
        let path = self.file_path(folder, name)?;
        self.sanitizer.sanitize(&path)?;
        tracing::debug!(folder, name, "Sanitized SVG");
        Ok(())
    }
}
