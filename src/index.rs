//! Lazy per-folder listing of media files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::asset::{is_sidecar, parse_retina, sidecar_name, Derivative, MediaAsset, SIDECAR_SUFFIX};
use crate::error::MediaError;
use crate::resolver::{Intent, PathResolver};

/// One physical file in a media folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaIndexEntry {
    pub filename: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Filename -> entry for one folder. Iteration order is unspecified.
pub type FolderListing = HashMap<String, MediaIndexEntry>;

/// Caches folder listings until explicitly invalidated.
pub struct MediaIndex {
    resolver: Arc<PathResolver>,
    folders: RwLock<HashMap<PathBuf, Arc<FolderListing>>>,
}

impl MediaIndex {
    pub fn new(resolver: Arc<PathResolver>) -> Self {
        Self {
            resolver,
            folders: RwLock::new(HashMap::new()),
        }
    }

    /// Files in `folder` (webroot-relative), scanned on first access.
    ///
    /// A folder that does not exist lists as empty.
    pub fn list_files(&self, folder: &Path) -> Result<Arc<FolderListing>, MediaError> {
        if let Some(listing) = self.folders.read().get(folder) {
            return Ok(Arc::clone(listing));
        }

        let listing = Arc::new(scan(&self.resolver.absolute(folder))?);
        self.folders
            .write()
            .insert(folder.to_path_buf(), Arc::clone(&listing));
        tracing::debug!(folder = %folder.display(), files = listing.len(), "Indexed media folder");
        Ok(listing)
    }

    /// Forget the listing of `folder` so the next access re-scans it.
    pub fn invalidate(&self, folder: &Path) {
        self.folders.write().remove(folder);
    }

    pub fn invalidate_all(&self) {
        self.folders.write().clear();
    }

    pub fn is_cached(&self, folder: &Path) -> bool {
        self.folders.read().contains_key(folder)
    }

    /// Build an asset for `filename` as seen from `folder`.
    ///
    /// Lookup order: the folder's index, then the name taken as a path
    /// relative to the folder (or a stream path) looked up in its own folder's
    /// index, then any existing file on disk as a standalone asset.
    pub fn create_from_filename(
        &self,
        folder: &Path,
        filename: &str,
    ) -> Result<Option<MediaAsset>, MediaError> {
        let listing = self.list_files(folder)?;
        if let Some(entry) = listing.get(filename) {
            return Ok(Some(self.asset_for(folder, entry, &listing)));
        }

        let relative = if self.resolver.is_virtual(filename) {
            match self.resolver.resolve(filename, Intent::Existing) {
                Ok(found) => found,
                Err(MediaError::UnresolvedStream { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        } else {
            self.resolver.relative(&folder.join(filename))
        };

        let Some(relative) = relative else {
            let path = Path::new(filename);
            return Ok(if path.is_absolute() {
                self.standalone(path)
            } else {
                None
            });
        };

        if let (Some(parent), Some(name)) = (relative.parent(), relative.file_name()) {
            let name = name.to_string_lossy();
            let listing = self.list_files(parent)?;
            if let Some(entry) = listing.get(name.as_ref()) {
                return Ok(Some(self.asset_for(parent, entry, &listing)));
            }
        }

        Ok(self.standalone(&self.resolver.absolute(&relative)))
    }

    fn standalone(&self, absolute: &Path) -> Option<MediaAsset> {
        let meta = std::fs::metadata(absolute).ok().filter(|m| m.is_file())?;
        let filename = absolute.file_name()?.to_string_lossy().to_string();
        let path = self
            .resolver
            .relative(absolute)
            .unwrap_or_else(|| absolute.to_path_buf());
        let mut asset = MediaAsset::new(&filename, path, meta.len(), modified(&meta));
        asset.standalone = true;
        asset.load_metadata(&absolute.with_file_name(sidecar_name(&filename)));
        Some(asset)
    }

    fn asset_for(&self, folder: &Path, entry: &MediaIndexEntry, listing: &FolderListing) -> MediaAsset {
        let mut asset = MediaAsset::new(
            &entry.filename,
            folder.join(&entry.filename),
            entry.size,
            entry.modified_at,
        );
        attach_family(&mut asset, listing.keys().map(String::as_str));
        if let Some(sidecar) = &asset.sidecar {
            let path = self.resolver.absolute(&folder.join(sidecar));
            asset.load_metadata(&path);
        }
        asset
    }

    /// Group a folder's files into assets with their derivatives attached.
    pub fn collection(&self, folder: &Path) -> Result<AssetCollection, MediaError> {
        let listing = self.list_files(folder)?;
        let mut assets = Vec::new();
        for entry in listing.values() {
            if is_derivative_of_present(&entry.filename, &listing) {
                continue;
            }
            assets.push(self.asset_for(folder, entry, &listing));
        }
        assets.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(AssetCollection { assets })
    }
}

/// Assets of one media folder, primaries only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetCollection {
    pub assets: Vec<MediaAsset>,
}

impl AssetCollection {
    pub fn get(&self, filename: &str) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.filename.as_str()).collect()
    }

    /// Put names listed in `order` first, in that order, the rest by name.
    pub fn apply_order(&mut self, order: &[String]) {
        let rank = |name: &str| order.iter().position(|o| o == name).unwrap_or(usize::MAX);
        self.assets
            .sort_by(|a, b| rank(&a.filename).cmp(&rank(&b.filename)).then(a.filename.cmp(&b.filename)));
    }
}

/// Sidecars and retina variants whose primary exists are not assets of their own.
fn is_derivative_of_present(filename: &str, listing: &FolderListing) -> bool {
    if is_sidecar(filename) {
        let primary = &filename[..filename.len() - SIDECAR_SUFFIX.len()];
        return listing.contains_key(primary);
    }
    parse_retina(filename).is_some_and(|(primary, _)| listing.contains_key(&primary))
}

fn attach_family<'a>(asset: &mut MediaAsset, names: impl Iterator<Item = &'a str>) {
    let sidecar = sidecar_name(&asset.filename);
    for name in names {
        if name == sidecar {
            asset.sidecar = Some(sidecar.clone());
        } else if let Some((primary, factor)) = parse_retina(name) {
            if primary == asset.filename {
                asset.derivatives.push(Derivative {
                    factor,
                    filename: name.to_string(),
                });
            }
        }
    }
    asset.derivatives.sort_by_key(|d| d.factor);
}

fn scan(dir: &Path) -> Result<FolderListing, MediaError> {
    let mut listing = FolderListing::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(listing),
        Err(e) => {
            return Err(MediaError::Read {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|e| MediaError::Read {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.starts_with('.') {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            continue;
        }
        listing.insert(
            filename.clone(),
            MediaIndexEntry {
                filename,
                size: meta.len(),
                modified_at: modified(&meta),
            },
        );
    }
    Ok(listing)
}

fn modified(meta: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}
