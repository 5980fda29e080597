//! media-manager - Lifecycle management for media files attached to content records
//!
//! This crate provides staged uploads, derivative-aware file operations and media
//! serving with:
//! - Stream paths (`user://pages/blog`) resolved against a single webroot
//! - Cached folder listings with retina variants and YAML metadata sidecars
//! - Per-record upload queues that are only written on commit
//! - redb embedded database for content records (ACID, MVCC, crash-safe)
//! - REST API with multipart upload support

pub mod api;
pub mod asset;
pub mod config;
pub mod error;
pub mod i18n;
pub mod index;
pub mod locator;
pub mod media;
pub mod ops;
pub mod resolver;
pub mod storage;
pub mod upload;
#[cfg(test)]
pub mod testutil;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use config::Config;
use i18n::{Catalog, Translator};
use locator::StreamLocator;
use media::MediaContext;
use ops::SvgHushSanitizer;
use resolver::absolute_root;
use storage::Database;
use upload::UploadQueue;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub media: Arc<MediaContext>,
    pub translator: Arc<dyn Translator>,
    /// Staged upload queues keyed by record id
    pub staged: Mutex<HashMap<String, UploadQueue>>,
    /// Spool directory for uploads waiting to be committed
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> std::io::Result<Self> {
        let webroot = absolute_root(std::path::Path::new(&config.media.webroot));
        std::fs::create_dir_all(&webroot)?;

        let upload_dir = PathBuf::from(&config.node.data_dir).join("uploads");
        std::fs::create_dir_all(&upload_dir)?;

        let mut locator = StreamLocator::new(&webroot);
        for stream in &config.media.streams {
            locator.add_scheme(&stream.scheme, stream.prefixes.iter().cloned());
        }

        let media = MediaContext::new(
            &webroot,
            Arc::new(locator),
            Arc::new(SvgHushSanitizer),
            config.max_upload_size,
            config.media.sanitize_svg,
        );

        Ok(Self {
            config,
            db,
            media: Arc::new(media),
            translator: Arc::new(Catalog::english()),
            staged: Mutex::new(HashMap::new()),
            upload_dir,
        })
    }
}
