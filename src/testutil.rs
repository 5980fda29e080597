//! Shared test helpers for media-manager unit tests.

use std::sync::Arc;

use crate::config::{Config, MediaConfig, NodeConfig, StreamConfig};
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and webroot.
///
/// The `user` stream maps to `<webroot>/user`.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let webroot = temp_dir.path().join("webroot");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        media: MediaConfig {
            webroot: webroot.to_string_lossy().to_string(),
            streams: vec![StreamConfig {
                scheme: "user".to_string(),
                prefixes: vec!["user".to_string()],
            }],
            sanitize_svg: true,
        },
        test_mode: true,
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let state = AppState::new(config, db).expect("Failed to create test state");
    Arc::new(state)
}
