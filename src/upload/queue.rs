//! Staged add/delete operations for one content record.
//!
//! Nothing touches the filesystem until [`UploadQueue::commit`]. Replay runs
//! in queue order and stops at the first failure; changes already applied
//! stay applied.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::field_path::FieldPath;
use super::handle::{UploadHandle, UploadMeta};
use super::settings::FieldSettings;
use crate::asset::split_name;
use crate::error::MediaError;
use crate::index::MediaIndex;
use crate::ops::FileOps;

/// Lifecycle of a record's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Clean,
    Dirty,
    Committed,
    Discarded,
}

/// One staged change. `upload: None` stages a delete.
#[derive(Debug)]
pub struct PendingUpload {
    pub key: FieldPath,
    /// Destination folder, relative to the webroot.
    pub folder: PathBuf,
    pub filename: String,
    pub upload: Option<Box<dyn UploadHandle>>,
    pub settings: FieldSettings,
}

impl PendingUpload {
    /// Webroot-relative path the change applies to.
    pub fn target(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }

    pub fn is_delete(&self) -> bool {
        self.upload.is_none()
    }

    pub fn summary(&self) -> PendingSummary {
        PendingSummary {
            field: self.key.field.clone(),
            file: self.key.file.clone(),
            action: if self.is_delete() {
                PendingAction::Delete
            } else {
                PendingAction::Add
            },
            upload: self.upload.as_ref().map(|u| u.meta()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingAction {
    Add,
    Delete,
}

/// Serializable view of a staged change.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSummary {
    pub field: String,
    pub file: String,
    pub action: PendingAction,
    pub upload: Option<UploadMeta>,
}

/// A change applied during commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
    pub field: String,
    pub path: PathBuf,
    pub action: PendingAction,
}

#[derive(Debug)]
pub struct UploadQueue {
    state: QueueState,
    entries: Vec<PendingUpload>,
    default_limit: u64,
}

impl UploadQueue {
    /// `default_limit` applies to fields without their own size limit.
    pub fn new(default_limit: u64) -> Self {
        Self {
            state: QueueState::Clean,
            entries: Vec::new(),
            default_limit,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[PendingUpload] {
        &self.entries
    }

    pub fn get(&self, target: &Path) -> Option<&PendingUpload> {
        self.entries.iter().find(|e| e.target() == target)
    }

    /// Stage an add (`Some(upload)`) or delete (`None`) of `filename` in `folder`.
    ///
    /// A later change to the same target replaces the earlier one and moves
    /// to the end of the replay order.
    pub fn queue_change(
        &mut self,
        key: FieldPath,
        folder: PathBuf,
        filename: &str,
        upload: Option<Box<dyn UploadHandle>>,
        settings: FieldSettings,
    ) -> Result<(), MediaError> {
        if let Some(upload) = &upload {
            settings.validate_upload(
                filename,
                upload.size(),
                upload.media_type(),
                self.default_limit,
            )?;
        }

        let entry = PendingUpload {
            key,
            folder,
            filename: filename.to_string(),
            upload,
            settings,
        };
        let target = entry.target();
        self.entries.retain(|e| e.target() != target);

        tracing::debug!(
            key = %entry.key,
            action = if entry.is_delete() { "delete" } else { "add" },
            "Staged media change"
        );
        self.entries.push(entry);
        self.state = QueueState::Dirty;
        Ok(())
    }

    /// Replay every staged change through `ops`.
    ///
    /// The locks of every destination folder are held for the whole replay.
    /// On failure the failed entry and everything after it stay queued and
    /// the error is wrapped in [`MediaError::Commit`].
    pub fn commit(
        &mut self,
        ops: &FileOps,
        index: &MediaIndex,
        sanitize_svg: bool,
    ) -> Result<Vec<AppliedChange>, MediaError> {
        let dirs: Vec<PathBuf> = self
            .entries
            .iter()
            .map(|e| ops.resolver().absolute(&e.folder))
            .collect();
        ops.locks().with_folders(dirs.iter().map(PathBuf::as_path), || {
            self.replay_all(ops, index, sanitize_svg)
        })
    }

    fn replay_all(
        &mut self,
        ops: &FileOps,
        index: &MediaIndex,
        sanitize_svg: bool,
    ) -> Result<Vec<AppliedChange>, MediaError> {
        let mut applied = Vec::new();
        let mut touched = BTreeSet::new();
        let mut remaining = std::mem::take(&mut self.entries).into_iter();

        let mut failure = None;
        for mut entry in remaining.by_ref() {
            touched.insert(entry.folder.clone());
            match replay(&mut entry, ops, sanitize_svg) {
                Ok(change) => applied.push(change),
                Err(e) => {
                    failure = Some((entry, e));
                    break;
                }
            }
        }

        for folder in &touched {
            index.invalidate(folder);
        }

        if let Some((entry, cause)) = failure {
            let key = entry.key.to_string();
            tracing::warn!(key = %key, applied = applied.len(), error = %cause, "Commit aborted");
            self.entries.push(entry);
            self.entries.extend(remaining);
            return Err(MediaError::Commit {
                key,
                source: Box::new(cause),
            });
        }

        self.state = QueueState::Committed;
        tracing::debug!(applied = applied.len(), "Committed staged media changes");
        Ok(applied)
    }

    /// Drop every staged change without touching the filesystem.
    pub fn discard(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.state = QueueState::Discarded;
        tracing::debug!(dropped, "Discarded staged media changes");
    }
}

fn replay(entry: &mut PendingUpload, ops: &FileOps, sanitize_svg: bool) -> Result<AppliedChange, MediaError> {
    let folder = entry.folder.to_string_lossy().to_string();
    let action = match entry.upload.as_mut() {
        Some(upload) => {
            ops.move_upload(upload.as_mut(), &entry.filename, &folder)?;
            let is_svg = split_name(&entry.filename)
                .1
                .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
            if sanitize_svg && is_svg {
                ops.sanitize_svg(&entry.filename, &folder)?;
            }
            PendingAction::Add
        }
        None => {
            ops.remove(&entry.filename, &folder)?;
            PendingAction::Delete
        }
    };

    Ok(AppliedChange {
        field: entry.key.field.clone(),
        path: entry.target(),
        action,
    })
}
