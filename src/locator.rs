//! Virtual ("stream") path lookup.
//!
//! A stream path looks like `user://pages/01.home`. The scheme names an
//! ordered list of prefixes below the webroot; the rest of the path is looked
//! up under each prefix in turn.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// Maps stream paths to real locations and back.
///
/// Paths returned by a locator are absolute.
pub trait ResourceLocator: Send + Sync {
    /// Whether `path` uses a scheme this locator knows about.
    fn is_stream(&self, path: &str) -> bool;

    /// Find the real location of `path`.
    ///
    /// With `create_intent` the expected location is returned even when
    /// nothing exists there yet.
    fn find_resource(&self, path: &str, create_intent: bool) -> Option<PathBuf>;

    /// Find an existing resource.
    fn get_resource(&self, path: &str) -> Option<PathBuf> {
        self.find_resource(path, false)
    }

    /// Reverse lookup: the stream path for an absolute real path.
    fn to_stream(&self, real: &Path) -> Option<String>;

    /// Forget any memoized lookup for `path`.
    fn clear_cache(&self, path: &str);

    /// Forget every memoized lookup that found, or could now find, the
    /// absolute path `real` or something below it.
    fn forget(&self, real: &Path);
}

/// Split `scheme://rest` into its parts.
pub fn split_stream(path: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = path.split_once("://")?;
    is_valid_scheme(scheme).then_some((scheme, rest))
}

/// Scheme identifiers follow URI rules: a letter, then letters, digits, `+`, `-`, `.`.
pub fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Table-driven locator rooted at a webroot.
pub struct StreamLocator {
    root: PathBuf,
    schemes: HashMap<String, Vec<PathBuf>>,
    cache: RwLock<HashMap<String, PathBuf>>,
}

impl StreamLocator {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            schemes: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register `scheme` with prefixes relative to the webroot, searched in order.
    pub fn add_scheme<I, P>(&mut self, scheme: &str, prefixes: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.schemes
            .entry(scheme.to_string())
            .or_default()
            .extend(prefixes.into_iter().map(Into::into));
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    fn candidates<'a>(&'a self, scheme: &str, rest: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        let rest = rest.trim_start_matches('/');
        self.schemes
            .get(scheme)
            .into_iter()
            .flatten()
            .map(move |prefix| {
                let base = self.root.join(prefix);
                if rest.is_empty() {
                    base
                } else {
                    base.join(rest)
                }
            })
    }
}

impl ResourceLocator for StreamLocator {
    fn is_stream(&self, path: &str) -> bool {
        split_stream(path).is_some_and(|(scheme, _)| self.schemes.contains_key(scheme))
    }

    fn find_resource(&self, path: &str, create_intent: bool) -> Option<PathBuf> {
        let (scheme, rest) = split_stream(path)?;

        if let Some(hit) = self.cache.read().get(path) {
            return Some(hit.clone());
        }

        if let Some(found) = self.candidates(scheme, rest).find(|p| p.exists()) {
            self.cache.write().insert(path.to_string(), found.clone());
            return Some(found);
        }

        if create_intent {
            return self.candidates(scheme, rest).next();
        }
        None
    }

    fn to_stream(&self, real: &Path) -> Option<String> {
        let mut schemes: Vec<_> = self.schemes.iter().collect();
        schemes.sort_by(|a, b| a.0.cmp(b.0));

        for (scheme, prefixes) in schemes {
            for prefix in prefixes {
                if let Ok(rest) = real.strip_prefix(self.root.join(prefix)) {
                    let rest = rest
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    return Some(format!("{scheme}://{rest}"));
                }
            }
        }
        None
    }

    fn clear_cache(&self, path: &str) {
        self.cache.write().remove(path);
    }

    fn forget(&self, real: &Path) {
        self.cache.write().retain(|key, hit| {
            if hit.starts_with(real) {
                return false;
            }
            match split_stream(key) {
                Some((scheme, rest)) => !self.candidates(scheme, rest).any(|c| c == real),
                None => true,
            }
        });
    }
}
