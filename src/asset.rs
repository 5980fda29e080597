//! Media assets and the derivative naming convention.
//!
//! A primary file `photo.jpg` may be accompanied by:
//! - retina variants `photo@2x.jpg`, `photo@3x.jpg`, ...
//! - a metadata sidecar `photo.jpg.meta.yaml`
//! - sidecars of the variants, `photo@2x.jpg.meta.yaml`
//!
//! Nothing links these files except their names, so every operation that
//! needs the family re-derives it from a directory listing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Suffix of metadata sidecar files.
pub const SIDECAR_SUFFIX: &str = ".meta.yaml";

/// Classification of a file derived from its MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Audio,
    Binary,
    Document,
    Image,
    Video,
}

impl FileType {
    /// Derive a file type classification from a MIME type string.
    pub fn from_mime(mime_type: &str) -> Self {
        let primary = mime_type.split('/').next().unwrap_or("");
        match primary {
            "audio" => FileType::Audio,
            "image" => FileType::Image,
            "video" => FileType::Video,
            "text" | "application" => {
                let sub = mime_type.split('/').nth(1).unwrap_or("");
                match sub {
                    "pdf"
                    | "msword"
                    | "rtf"
                    | "csv"
                    | "vnd.openxmlformats-officedocument.wordprocessingml.document"
                    | "vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                    | "vnd.openxmlformats-officedocument.presentationml.presentation"
                    | "vnd.ms-excel"
                    | "vnd.ms-powerpoint" => FileType::Document,
                    _ if primary == "text" => FileType::Document,
                    _ => FileType::Binary,
                }
            }
            _ => FileType::Binary,
        }
    }

    pub fn from_filename(filename: &str) -> Self {
        Self::from_mime(mime_type(filename).as_str())
    }
}

/// Guessed MIME type, `application/octet-stream` when unknown.
pub fn mime_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Split a file name into stem and extension (`photo.jpg` -> `photo`, `jpg`).
pub fn split_name(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(0) | None => (filename, None),
        Some(i) => (&filename[..i], Some(&filename[i + 1..])),
    }
}

pub fn sidecar_name(filename: &str) -> String {
    format!("{filename}{SIDECAR_SUFFIX}")
}

pub fn is_sidecar(filename: &str) -> bool {
    filename.len() > SIDECAR_SUFFIX.len() && filename.ends_with(SIDECAR_SUFFIX)
}

/// Name of the retina variant of `filename` at `factor`.
pub fn retina_name(filename: &str, factor: u32) -> String {
    match split_name(filename) {
        (stem, Some(ext)) => format!("{stem}@{factor}x.{ext}"),
        (stem, None) => format!("{stem}@{factor}x"),
    }
}

/// Parse `stem@Nx.ext` into (`stem.ext`, N).
pub fn parse_retina(filename: &str) -> Option<(String, u32)> {
    let (stem, ext) = split_name(filename);
    let at = stem.rfind('@')?;
    let factor = stem[at + 1..].strip_suffix('x')?;
    if factor.is_empty() || !factor.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let factor = factor.parse().ok()?;
    let base = &stem[..at];
    if base.is_empty() {
        return None;
    }
    let primary = match ext {
        Some(ext) => format!("{base}.{ext}"),
        None => base.to_string(),
    };
    Some((primary, factor))
}

/// Pattern matching every derivative of `filename` (never the file itself).
pub fn derivative_pattern(filename: &str) -> Regex {
    let sidecar = format!("^{}{}$", regex::escape(filename), regex::escape(SIDECAR_SUFFIX));
    let pattern = match split_name(filename) {
        (stem, Some(ext)) => format!(
            r"^{}@\d+x\.{}(?:{})?$|{sidecar}",
            regex::escape(stem),
            regex::escape(ext),
            regex::escape(SIDECAR_SUFFIX),
        ),
        (_, None) => sidecar,
    };
    // Every piece of user input above is escaped.
    Regex::new(&pattern).unwrap_or_else(|_| unreachable!("escaped derivative pattern"))
}

/// Pick the derivatives of `filename` out of a directory listing.
pub fn derive_related_names<I, S>(filename: &str, entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let pattern = derivative_pattern(filename);
    let mut names: Vec<String> = entries
        .into_iter()
        .filter(|e| pattern.is_match(e.as_ref()))
        .map(|e| e.as_ref().to_string())
        .collect();
    names.sort();
    names
}

/// Map a derivative name of `from` onto the equivalent name for `to`.
///
/// `photo@2x.jpg.meta.yaml` with `photo.jpg` -> `sunset.png` gives
/// `sunset@2x.png.meta.yaml`.
pub fn rebase_derivative(derivative: &str, from: &str, to: &str) -> Option<String> {
    if let Some(primary) = derivative.strip_suffix(SIDECAR_SUFFIX) {
        if primary == from {
            return Some(sidecar_name(to));
        }
        return rebase_derivative(primary, from, to).map(|n| sidecar_name(&n));
    }
    let (primary, factor) = parse_retina(derivative)?;
    (primary == from).then(|| retina_name(to, factor))
}

/// A retina variant attached to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Derivative {
    pub factor: u32,
    pub filename: String,
}

/// The logical unit callers see: a primary file plus its derivatives.
#[derive(Debug, Clone, Serialize)]
pub struct MediaAsset {
    pub filename: String,
    /// Path relative to the webroot.
    pub path: PathBuf,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub file_type: FileType,
    pub mime_type: String,
    pub derivatives: Vec<Derivative>,
    pub sidecar: Option<String>,
    pub metadata: Option<BTreeMap<String, serde_yaml::Value>>,
    /// Lives outside the indexed media folder.
    pub standalone: bool,
    /// Staged but not committed yet.
    pub pending: bool,
}

impl MediaAsset {
    pub fn new(filename: &str, path: PathBuf, size: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            filename: filename.to_string(),
            path,
            size,
            modified_at,
            file_type: FileType::from_filename(filename),
            mime_type: mime_type(filename),
            derivatives: Vec::new(),
            sidecar: None,
            metadata: None,
            standalone: false,
            pending: false,
        }
    }

    /// Load metadata from the sidecar at `sidecar_path` if present and valid.
    pub fn load_metadata(&mut self, sidecar_path: &Path) {
        let raw = match std::fs::read_to_string(sidecar_path) {
            Ok(raw) => raw,
            Err(_) => return,
        };
        match serde_yaml::from_str(&raw) {
            Ok(meta) => self.metadata = Some(meta),
            Err(e) => tracing::warn!(
                path = %sidecar_path.display(),
                error = %e,
                "Ignoring unreadable metadata sidecar"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("photo.jpg"), ("photo", Some("jpg")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name("README"), ("README", None));
        assert_eq!(split_name(".hidden"), (".hidden", None));
    }

    #[test]
    fn test_parse_retina() {
        assert_eq!(parse_retina("photo@2x.jpg"), Some(("photo.jpg".to_string(), 2)));
        assert_eq!(parse_retina("a@b@3x.png"), Some(("a@b.png".to_string(), 3)));
        assert_eq!(parse_retina("photo@x.jpg"), None);
        assert_eq!(parse_retina("photo.jpg"), None);
        assert_eq!(parse_retina("@2x.jpg"), None);
    }

    #[test]
    fn test_derivative_pattern_matches_family_only() {
        let entries = [
            "photo.jpg",
            "photo@2x.jpg",
            "photo@3x.jpg",
            "photo@2x.jpg.meta.yaml",
            "photo.jpg.meta.yaml",
            "myphoto@2x.jpg",
            "photo@2x.png",
            "photo.png.meta.yaml",
            "photo@2xjpg",
        ];
        let related = derive_related_names("photo.jpg", entries);
        assert_eq!(
            related,
            vec![
                "photo.jpg.meta.yaml",
                "photo@2x.jpg",
                "photo@2x.jpg.meta.yaml",
                "photo@3x.jpg",
            ]
        );
    }

    #[test]
    fn test_derivative_pattern_escapes_metacharacters() {
        let related = derive_related_names("a+b (1).jpg", ["a+b (1)@2x.jpg", "aab (1)@2x.jpg"]);
        assert_eq!(related, vec!["a+b (1)@2x.jpg"]);
    }

    #[test]
    fn test_rebase_derivative() {
        assert_eq!(
            rebase_derivative("photo@2x.jpg", "photo.jpg", "sunset.jpg").as_deref(),
            Some("sunset@2x.jpg")
        );
        assert_eq!(
            rebase_derivative("photo@2x.jpg.meta.yaml", "photo.jpg", "sunset.png").as_deref(),
            Some("sunset@2x.png.meta.yaml")
        );
        assert_eq!(
            rebase_derivative("photo.jpg.meta.yaml", "photo.jpg", "sunset.jpg").as_deref(),
            Some("sunset.jpg.meta.yaml")
        );
        assert_eq!(rebase_derivative("other@2x.jpg", "photo.jpg", "x.jpg"), None);
    }

    #[test]
    fn test_file_type_from_filename() {
        assert_eq!(FileType::from_filename("logo.png"), FileType::Image);
        assert_eq!(FileType::from_filename("icon.svg"), FileType::Image);
        assert_eq!(FileType::from_filename("report.pdf"), FileType::Document);
        assert_eq!(FileType::from_filename("blob.unknownext"), FileType::Binary);
    }
}
