//! Configuration management for the dirview service.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/dirview/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("items_per_page must be between 1 and 10000, got {0}")]
    InvalidItemsPerPage(usize),

    #[error("upload max_size must be greater than 0, got {0}")]
    InvalidMaxSize(u64),

    #[error("show_hidden_key must not be empty")]
    EmptyShowHiddenKey,

    #[error("bind_addr must be a socket address like 127.0.0.1:8080, got {0}")]
    InvalidBindAddr(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Extensions refused for download unless the configuration says otherwise.
pub const DEFAULT_DENIED_EXTENSIONS: &[&str] = &[
    "php", "phtml", "php3", "php4", "php5", "php7", "phps", "phar", "cgi", "pl", "sh", "bash",
    "bat", "cmd", "com", "exe", "ps1", "htaccess", "htpasswd",
];

/// Built-in extension to content type table.
pub const DEFAULT_MIME_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

/// Main configuration structure for dirview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Listener and logging.
    pub server: ServerConfig,

    /// Directory listing behaviour.
    pub browse: BrowseConfig,

    /// Download policy.
    pub download: DownloadConfig,

    /// Upload limits.
    pub upload: UploadConfig,
}

/// Listener and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory served as the browsing root.
    pub root_dir: PathBuf,

    /// Socket address to listen on.
    pub bind_addr: String,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Directory listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowseConfig {
    /// Query parameter that reveals dot files when set to `1`.
    pub show_hidden_key: String,

    /// Follow symlinks that stay inside the root.
    pub follow_symlinks: bool,

    /// Entries per listing page.
    pub items_per_page: usize,

    /// Name hidden from the root listing. Defaults to the executable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_name: Option<String>,
}

/// Download configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    /// Serve file contents at all.
    pub enabled: bool,

    /// Extensions that are never served.
    pub denied_extensions: Vec<String>,

    /// Extension to content type overrides.
    pub mime_types: BTreeMap<String, String>,
}

/// Upload configuration. Uploads are not served yet; the limits are
/// validated so existing config files stay valid once they are.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,

    /// Maximum upload size in bytes (default: 10MB).
    pub max_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            bind_addr: "127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            show_hidden_key: "hidden".to_string(),
            follow_symlinks: false,
            items_per_page: 100,
            exclude_name: None,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            denied_extensions: DEFAULT_DENIED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            mime_types: DEFAULT_MIME_TYPES
                .iter()
                .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
                .collect(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl BrowseConfig {
    /// The configured exclude name, or the running executable's file name.
    pub fn effective_exclude_name(&self) -> Option<String> {
        self.exclude_name.clone().or_else(current_exe_name)
    }
}

fn current_exe_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    exe.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dirview")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - DIRVIEW_ROOT: Override the served directory
    /// - DIRVIEW_BIND_ADDR: Override the listen address
    /// - DIRVIEW_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("DIRVIEW_ROOT") {
            if !root.is_empty() {
                tracing::info!("Overriding root_dir from environment: {}", root);
                self.server.root_dir = PathBuf::from(root);
            }
        }

        if let Ok(addr) = std::env::var("DIRVIEW_BIND_ADDR") {
            if !addr.is_empty() {
                tracing::info!("Overriding bind_addr from environment: {}", addr);
                self.server.bind_addr = addr;
            }
        }

        if let Ok(level) = std::env::var("DIRVIEW_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.server.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate items_per_page: 1-10000
        let per_page = self.browse.items_per_page;
        if !(1..=10_000).contains(&per_page) {
            return Err(ConfigError::InvalidItemsPerPage(per_page));
        }

        if self.upload.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.upload.max_size));
        }

        if self.browse.show_hidden_key.trim().is_empty() {
            return Err(ConfigError::EmptyShowHiddenKey);
        }

        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.server.bind_addr.clone()));
        }

        // Validate log_level is a known value
        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    /// Parsed listen address. Only valid after [`Config::validate`].
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_addr))
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<()> {
        self.save(default_config_path())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
