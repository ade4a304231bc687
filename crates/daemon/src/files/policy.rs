//! Extension based download policy.
//!
//! Dangerous file types are refused by a denylist of extensions. A denylist
//! is inherently incomplete; new executable or server-side script types need
//! to be added to the configuration as they appear.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use protocol::EntryKind;

use crate::config::DownloadConfig;

use super::mime;

/// Lowercased suffix after the last `.` of a file name.
///
/// Unlike [`Path::extension`], a leading dot counts, so `.htaccess` has the
/// extension `htaccess` and can be matched by the denylist.
pub fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Download rules shared by the enumerator and the download gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPolicy {
    enabled: bool,
    denied_extensions: HashSet<String>,
    mime_types: HashMap<String, String>,
}

impl DownloadPolicy {
    pub fn new(
        enabled: bool,
        denied_extensions: impl IntoIterator<Item = String>,
        mime_types: HashMap<String, String>,
    ) -> Self {
        Self {
            enabled,
            denied_extensions: denied_extensions
                .into_iter()
                .map(|ext| normalize_extension(&ext))
                .collect(),
            mime_types: mime_types
                .into_iter()
                .map(|(ext, mime)| (normalize_extension(&ext), mime))
                .collect(),
        }
    }

    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(
            config.enabled,
            config.denied_extensions.iter().cloned(),
            config
                .mime_types
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the extension is on the denylist.
    pub fn is_denied(&self, extension: &str) -> bool {
        self.denied_extensions.contains(extension)
    }

    /// Whether a listed entry should be offered for download.
    pub fn is_downloadable(&self, kind: EntryKind, extension: &str) -> bool {
        kind == EntryKind::File && self.enabled && !self.is_denied(extension)
    }

    /// Content type for a file about to be served.
    pub fn mime_type(&self, extension: &str, path: &Path) -> String {
        mime::resolve(&self.mime_types, extension, path)
    }
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self::from_config(&DownloadConfig::default())
    }
}

/// Lowercase and strip a leading dot, so `".PHP"` and `"php"` match.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
