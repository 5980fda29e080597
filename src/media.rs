//! Per-record media API.
//!
//! [`Media`] binds one content record to its media folder and composes the
//! resolver, index, file operations and the record's staged upload queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::asset::{split_name, MediaAsset};
use crate::error::{MediaError, UploadError};
use crate::index::{AssetCollection, MediaIndex};
use crate::locator::ResourceLocator;
use crate::ops::{FileOps, RenameOutcome, Sanitizer};
use crate::resolver::{Intent, PathResolver};
use crate::upload::{
    check_filename, AppliedChange, Blueprint, FieldPath, FieldSettings, UploadHandle, UploadQueue,
};

/// Destination marker meaning "the record's own media folder".
const SELF_DESTINATION: &str = "self@";

/// Services shared by every record.
pub struct MediaContext {
    pub resolver: Arc<PathResolver>,
    pub index: Arc<MediaIndex>,
    pub ops: Arc<FileOps>,
    /// Size limit for fields without their own.
    pub max_upload_size: u64,
    /// Sanitize SVG files when a commit lands them.
    pub sanitize_svg: bool,
}

impl MediaContext {
    pub fn new<P: AsRef<Path>>(
        webroot: P,
        locator: Arc<dyn ResourceLocator>,
        sanitizer: Arc<dyn Sanitizer>,
        max_upload_size: u64,
        sanitize_svg: bool,
    ) -> Self {
        let resolver = Arc::new(PathResolver::new(webroot, locator));
        Self {
            index: Arc::new(MediaIndex::new(Arc::clone(&resolver))),
            ops: Arc::new(FileOps::new(Arc::clone(&resolver), sanitizer)),
            resolver,
            max_upload_size,
            sanitize_svg,
        }
    }
}

/// The directory backing a record's media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaFolder {
    /// Relative to the webroot. `None` means the record has no media.
    pub real_path: Option<PathBuf>,
    pub virtual_path: Option<String>,
}

impl MediaFolder {
    pub fn resolve(resolver: &PathResolver, media_path: &str) -> Result<Self, MediaError> {
        if media_path.trim().is_empty() {
            return Ok(Self::default());
        }
        if resolver.is_virtual(media_path) {
            return Ok(Self {
                real_path: resolver.resolve(media_path, Intent::Create)?,
                virtual_path: Some(media_path.to_string()),
            });
        }
        let real_path = resolver.resolve(media_path, Intent::Existing)?;
        let virtual_path = real_path.as_deref().and_then(|p| resolver.to_virtual(p));
        Ok(Self {
            real_path,
            virtual_path,
        })
    }
}

/// Where an accepted upload will land.
#[derive(Debug, Clone)]
pub struct ResolvedUpload {
    /// Destination folder, relative to the webroot.
    pub folder: PathBuf,
    pub filename: String,
    pub settings: FieldSettings,
}

pub struct Media {
    ctx: Arc<MediaContext>,
    blueprint: Arc<dyn Blueprint>,
    folder: MediaFolder,
    queue: UploadQueue,
    assets: Option<AssetCollection>,
}

impl Media {
    pub fn new(
        ctx: Arc<MediaContext>,
        media_path: &str,
        blueprint: Arc<dyn Blueprint>,
    ) -> Result<Self, MediaError> {
        let folder = MediaFolder::resolve(&ctx.resolver, media_path)?;
        let queue = UploadQueue::new(ctx.max_upload_size);
        Ok(Self {
            ctx,
            blueprint,
            folder,
            queue,
            assets: None,
        })
    }

    /// Continue with a queue staged by an earlier instance of this record.
    pub fn with_queue(mut self, queue: UploadQueue) -> Self {
        self.queue = queue;
        self.assets = None;
        self
    }

    pub fn into_queue(self) -> UploadQueue {
        self.queue
    }

    pub fn folder(&self) -> &MediaFolder {
        &self.folder
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    /// Every asset of the record, including staged additions and without
    /// staged deletions.
    pub fn get_media(&mut self) -> Result<&AssetCollection, MediaError> {
        if self.assets.is_none() {
            let collection = match &self.folder.real_path {
                Some(folder) => self.ctx.index.collection(folder)?,
                None => AssetCollection::default(),
            };
            self.assets = Some(self.overlay_pending(collection, None));
        }
        Ok(self.assets.get_or_insert_with(AssetCollection::default))
    }

    /// Assets in a field's destination folder, in the field's order.
    pub fn field_media(&self, field: &str) -> Result<AssetCollection, MediaError> {
        let settings = self.settings(field)?;
        let folder = self.destination_folder(field, &settings)?;
        let collection = self.ctx.index.collection(&folder)?;
        let mut collection = self.overlay_pending(collection, Some(&folder));
        collection.apply_order(&settings.order);
        Ok(collection)
    }

    /// Look up a single asset by name, path, or stream path.
    pub fn find(&self, filename: &str) -> Result<Option<MediaAsset>, MediaError> {
        let folder = self.folder.real_path.clone().unwrap_or_default();
        self.ctx.index.create_from_filename(&folder, filename)
    }

    /// Validate `upload` for `field` and decide its final name and folder.
    pub fn check_upload(
        &self,
        upload: &dyn UploadHandle,
        filename: Option<&str>,
        field: &str,
    ) -> Result<ResolvedUpload, MediaError> {
        let settings = self.settings(field)?;
        let folder = self.destination_folder(field, &settings)?;

        let requested = filename.unwrap_or(upload.client_filename());
        let mut name = check_filename(requested)?.to_string();
        settings.validate_upload(
            &name,
            upload.size(),
            upload.media_type(),
            self.ctx.max_upload_size,
        )?;

        if settings.random_name {
            name = match split_name(&name) {
                (_, Some(ext)) => format!("{}.{}", uuid::Uuid::new_v4().simple(), ext.to_ascii_lowercase()),
                (_, None) => uuid::Uuid::new_v4().simple().to_string(),
            };
        }
        if settings.avoid_overwriting && self.target_taken(&folder, &name) {
            name = format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), name);
        }

        Ok(ResolvedUpload {
            folder,
            filename: name,
            settings,
        })
    }

    /// Stage an upload for `field`. Nothing is written until [`Media::commit`].
    pub fn upload(
        &mut self,
        field: &str,
        upload: Box<dyn UploadHandle>,
        filename: Option<&str>,
    ) -> Result<FieldPath, MediaError> {
        let resolved = self.check_upload(upload.as_ref(), filename, field)?;
        let key = FieldPath::new(field, &self.file_part(&resolved.folder, &resolved.filename))?;
        self.queue.queue_change(
            key.clone(),
            resolved.folder,
            &resolved.filename,
            Some(upload),
            resolved.settings,
        )?;
        self.invalidate();
        Ok(key)
    }

    /// Stage deletion of `filename` from `field`'s folder.
    pub fn delete(&mut self, field: &str, filename: &str) -> Result<FieldPath, MediaError> {
        check_local_name(filename)?;
        let settings = self.settings(field)?;
        let folder = self.destination_folder(field, &settings)?;
        let key = FieldPath::new(field, &self.file_part(&folder, filename))?;
        self.queue
            .queue_change(key.clone(), folder, filename, None, settings)?;
        self.invalidate();
        Ok(key)
    }

    /// Rename a file in the media folder right away.
    ///
    /// `from` must name a file directly inside the folder and `to` must pass
    /// the same checks as an uploaded file name.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<RenameOutcome, MediaError> {
        check_local_name(from)?;
        check_filename(to)?;
        let folder = self.real_folder()?;
        let outcome = self
            .ctx
            .ops
            .rename(from, to, &folder.to_string_lossy());
        self.invalidate();
        outcome
    }

    /// Copy a file within the media folder right away.
    pub fn copy(&mut self, source: &str, target: &str) -> Result<PathBuf, MediaError> {
        check_local_name(source)?;
        check_filename(target)?;
        let folder = self.real_folder()?;
        let copied = self
            .ctx
            .ops
            .copy(source, target, &folder.to_string_lossy());
        self.invalidate();
        copied
    }

    /// Apply every staged change.
    pub fn commit(&mut self) -> Result<Vec<AppliedChange>, MediaError> {
        let result = self
            .queue
            .commit(&self.ctx.ops, &self.ctx.index, self.ctx.sanitize_svg);
        self.invalidate();
        result
    }

    /// Forget every staged change.
    pub fn discard(&mut self) {
        self.queue.discard();
        self.assets = None;
    }

    fn invalidate(&mut self) {
        self.assets = None;
        if let Some(folder) = &self.folder.real_path {
            self.ctx.index.invalidate(folder);
        }
    }

    fn real_folder(&self) -> Result<PathBuf, MediaError> {
        self.folder
            .real_path
            .clone()
            .ok_or_else(|| MediaError::BadDestination {
                destination: SELF_DESTINATION.to_string(),
            })
    }

    fn settings(&self, field: &str) -> Result<FieldSettings, MediaError> {
        self.blueprint
            .field_settings(field)
            .ok_or_else(|| MediaError::BadDestination {
                destination: field.to_string(),
            })
    }

    /// Webroot-relative folder uploads for `field` land in.
    fn destination_folder(&self, field: &str, settings: &FieldSettings) -> Result<PathBuf, MediaError> {
        let bad = || MediaError::BadDestination {
            destination: settings
                .destination
                .clone()
                .unwrap_or_else(|| field.to_string()),
        };

        let destination = match settings.destination.as_deref() {
            Some(d) if d != SELF_DESTINATION && !settings.self_folder => d,
            _ => return self.folder.real_path.clone().ok_or_else(bad),
        };

        if self.ctx.resolver.is_virtual(destination) {
            return self.ctx.resolver.resolve(destination, Intent::Create)?.ok_or_else(bad);
        }
        let base = self.folder.real_path.as_ref().ok_or_else(bad)?;
        self.ctx.resolver.relative(&base.join(destination)).ok_or_else(bad)
    }

    /// File part of a field path: relative to the media folder when inside it.
    fn file_part(&self, folder: &Path, filename: &str) -> String {
        let target = folder.join(filename);
        let relative = self
            .folder
            .real_path
            .as_deref()
            .and_then(|base| target.strip_prefix(base).ok())
            .unwrap_or(&target);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn target_taken(&self, folder: &Path, filename: &str) -> bool {
        let target = folder.join(filename);
        if let Some(pending) = self.queue.get(&target) {
            return !pending.is_delete();
        }
        self.ctx.resolver.absolute(&target).exists()
    }

    /// Apply staged changes to a listing. With `only`, restrict to that folder.
    fn overlay_pending(&self, mut collection: AssetCollection, only: Option<&Path>) -> AssetCollection {
        for entry in self.queue.entries() {
            if only.is_some_and(|folder| folder != entry.folder) {
                continue;
            }
            let target = entry.target();
            collection.assets.retain(|a| a.path != target);
            if let Some(upload) = &entry.upload {
                let mut asset = MediaAsset::new(&entry.filename, target, upload.size(), None);
                asset.pending = true;
                collection.assets.push(asset);
            }
        }
        collection.assets.sort_by(|a, b| a.filename.cmp(&b.filename));
        collection
    }
}

/// A name that stays inside the folder it is looked up in.
fn check_local_name(name: &str) -> Result<&str, MediaError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(UploadError::InvalidFilename(name.to_string()).into());
    }
    Ok(name)
}
