use std::path::{Path, PathBuf};

use super::{dir_file_names, file_name, parent_dir, FileOps};
use crate::asset::{derive_related_names, rebase_derivative, sidecar_name};
use crate::error::MediaError;

/// Files renamed by [`FileOps::rename`], as `(from, to)` names.
///
/// Empty when the source did not exist.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub renamed: Vec<(String, String)>,
}

impl RenameOutcome {
    pub fn is_noop(&self) -> bool {
        self.renamed.is_empty()
    }
}

impl FileOps {
    /// Rename `from` to `to` in the directory of `from`, with its sidecar
    /// and retina variants.
    ///
    /// A missing source is a no-op. Existing destinations are never
    /// overwritten: every destination in the family is checked before the
    /// first rename happens.
    pub fn rename(&self, from: &str, to: &str, folder: &str) -> Result<RenameOutcome, MediaError> {
        let source = self.file_path(folder, from)?;
        let dir = parent_dir(&source).to_path_buf();

        self.locks.with_folder(&dir, || {
            if !source.is_file() {
                tracing::debug!(folder, from, "Rename source missing, nothing to do");
                return Ok(RenameOutcome::default());
            }

            let from_name = file_name(&source);
            let to_name = Path::new(to)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if to_name.is_empty() || to_name == from_name {
                return Ok(RenameOutcome::default());
            }
            let target = dir.join(&to_name);

            if target.exists() {
                return Err(MediaError::Conflict {
                    from: source.clone(),
                    to: target,
                });
            }

            let plan = self.derivative_plan(&dir, &from_name, &to_name)?;
            for (_, derivative_target) in &plan {
                if derivative_target.exists() {
                    return Err(MediaError::Conflict {
                        from: source.clone(),
                        to: derivative_target.clone(),
                    });
                }
            }

            std::fs::rename(&source, &target).map_err(|e| MediaError::Rename {
                from: source.clone(),
                to: target.clone(),
                message: e.to_string(),
            })?;
            let mut outcome = RenameOutcome {
                renamed: vec![(from_name.clone(), to_name.clone())],
            };

            let sidecar = sidecar_name(&from_name);
            for (derivative_source, derivative_target) in plan {
                let is_sidecar = file_name(&derivative_source) == sidecar;
                std::fs::rename(&derivative_source, &derivative_target).map_err(|e| {
                    tracing::warn!(
                        from = %derivative_source.display(),
                        error = %e,
                        "Primary renamed but derivative rename failed"
                    );
                    if is_sidecar {
                        MediaError::MetadataRename {
                            from: derivative_source.clone(),
                            to: derivative_target.clone(),
                            message: e.to_string(),
                        }
                    } else {
                        MediaError::DerivativeRename {
                            from: derivative_source.clone(),
                            to: derivative_target.clone(),
                            message: e.to_string(),
                        }
                    }
                })?;
                self.forget(&derivative_source);
                self.forget(&derivative_target);
                outcome
                    .renamed
                    .push((file_name(&derivative_source), file_name(&derivative_target)));
            }

            self.forget(&source);
            self.forget(&target);
            tracing::debug!(folder, from, to, files = outcome.renamed.len(), "Renamed media file");
            Ok(outcome)
        })
    }

    /// Source and destination of every derivative, sidecar first.
    fn derivative_plan(
        &self,
        dir: &Path,
        from: &str,
        to: &str,
    ) -> Result<Vec<(PathBuf, PathBuf)>, MediaError> {
        let names = dir_file_names(dir).map_err(|e| MediaError::Read {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let sidecar = sidecar_name(from);

        let mut plan: Vec<(PathBuf, PathBuf)> = derive_related_names(from, &names)
            .into_iter()
            .filter_map(|name| {
                let target = rebase_derivative(&name, from, to)?;
                Some((dir.join(name), dir.join(target)))
            })
            .collect();
        plan.sort_by_key(|(source, _)| file_name(source) != sidecar);
        Ok(plan)
    }
}
