use std::path::{Component, Path};

use thiserror::Error;

use crate::locator::is_valid_scheme;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub media: MediaConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    /// Holds the record database and spooled uploads
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Every real media path is relative to this directory
    pub webroot: String,
    pub streams: Vec<StreamConfig>,
    /// Sanitize SVG uploads once they are committed
    pub sanitize_svg: bool,
}

/// A stream scheme and the webroot-relative prefixes it searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub scheme: String,
    pub prefixes: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            webroot: "./webroot".to_string(),
            streams: vec![StreamConfig {
                scheme: "user".to_string(),
                prefixes: vec!["user".to_string()],
            }],
            sanitize_svg: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let webroot = std::env::var("WEBROOT").unwrap_or_else(|_| "./webroot".to_string());

        let streams = match std::env::var("MEDIA_STREAMS") {
            Ok(raw) => parse_streams(&raw)?,
            Err(_) => MediaConfig::default().streams,
        };

        let sanitize_svg = std::env::var("SANITIZE_SVG")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            media: MediaConfig {
                webroot,
                streams,
                sanitize_svg,
            },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.media.webroot.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "WEBROOT cannot be empty".to_string(),
            ));
        }

        for stream in &self.media.streams {
            if !is_valid_scheme(&stream.scheme) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid stream scheme '{}'",
                    stream.scheme
                )));
            }
            if stream.prefixes.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Stream '{}' has no prefixes",
                    stream.scheme
                )));
            }
            for prefix in &stream.prefixes {
                let path = Path::new(prefix);
                if path.is_absolute()
                    || path.components().any(|c| matches!(c, Component::ParentDir))
                {
                    return Err(ConfigError::ValidationError(format!(
                        "Stream '{}' prefix '{}' must stay inside WEBROOT",
                        stream.scheme, prefix
                    )));
                }
            }
        }

        if self.max_upload_size == 0 {
            tracing::warn!("MAX_UPLOAD_SIZE is 0, every upload will be rejected");
        }

        Ok(())
    }
}

/// Parse `scheme=prefix[|prefix...]` entries separated by commas.
pub fn parse_streams(raw: &str) -> Result<Vec<StreamConfig>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (scheme, prefixes) = entry.split_once('=').ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "MEDIA_STREAMS entry '{entry}' must look like scheme=path"
                ))
            })?;
            Ok(StreamConfig {
                scheme: scheme.trim().to_string(),
                prefixes: prefixes
                    .split('|')
                    .map(|p| p.trim().trim_matches('/').to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            })
        })
        .collect()
}
