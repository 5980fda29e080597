//! Canonical path resolution between stream paths and webroot-relative paths.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::MediaError;
use crate::locator::{split_stream, ResourceLocator};

/// Whether the resolved path must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Existing,
    /// Fabricate the expected location of something about to be written.
    Create,
}

/// Resolves virtual and filesystem paths to paths relative to the webroot.
pub struct PathResolver {
    webroot: PathBuf,
    locator: Arc<dyn ResourceLocator>,
}

impl PathResolver {
    /// `webroot` should be absolute (see [`absolute_root`]) and match the
    /// root the locator was built with.
    pub fn new<P: AsRef<Path>>(webroot: P, locator: Arc<dyn ResourceLocator>) -> Self {
        Self {
            webroot: absolute_root(webroot.as_ref()),
            locator,
        }
    }

    pub fn webroot(&self) -> &Path {
        &self.webroot
    }

    pub fn locator(&self) -> &Arc<dyn ResourceLocator> {
        &self.locator
    }

    /// Whether `path` has stream syntax (`scheme://...`).
    pub fn is_virtual(&self, path: &str) -> bool {
        split_stream(path).is_some()
    }

    /// Resolve `path` to a webroot-relative path.
    ///
    /// Returns `Ok(None)` when the path lies outside the webroot.
    pub fn resolve(&self, path: &str, intent: Intent) -> Result<Option<PathBuf>, MediaError> {
        if self.is_virtual(path) {
            if !self.locator.is_stream(path) {
                return Err(MediaError::UnresolvedStream {
                    path: path.to_string(),
                });
            }
            let found = self
                .locator
                .find_resource(path, intent == Intent::Create)
                .ok_or_else(|| MediaError::UnresolvedStream {
                    path: path.to_string(),
                })?;
            return Ok(self.relative(&found));
        }

        Ok(self.relative(Path::new(path)))
    }

    /// Rebase `path` onto the webroot, or `None` if it escapes it.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            let normalized = normalize(path)?;
            normalized
                .strip_prefix(&self.webroot)
                .ok()
                .map(Path::to_path_buf)
        } else {
            normalize(path)
        }
    }

    /// Absolute location of a webroot-relative path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.webroot.join(relative)
    }

    /// Resolve straight to an absolute path.
    pub fn resolve_absolute(&self, path: &str, intent: Intent) -> Result<Option<PathBuf>, MediaError> {
        Ok(self.resolve(path, intent)?.map(|p| self.absolute(&p)))
    }

    /// The stream alias for a webroot-relative path, if any scheme covers it.
    pub fn to_virtual(&self, real: &Path) -> Option<String> {
        self.locator.to_stream(&self.absolute(real))
    }

    /// Drop memoized stream lookups touching the absolute path `real`.
    pub fn forget(&self, real: &Path) {
        self.locator.forget(real);
    }

    /// Drop any memoized stream lookup for `path`.
    pub fn clear_cache(&self, path: &str) {
        if self.is_virtual(path) {
            self.locator.clear_cache(path);
        }
    }
}

/// Make a configured root absolute against the working directory.
pub fn absolute_root(root: &Path) -> PathBuf {
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(root),
            Err(_) => root.to_path_buf(),
        }
    };
    normalize(&joined).unwrap_or(joined)
}

/// Lexically normalize `.` and `..`.
///
/// Returns `None` when a relative path climbs above its starting point.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}
