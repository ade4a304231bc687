//! Directory enumeration with visibility rules.
//!
//! This module lists the direct children of an already resolved directory
//! and describes each one as a [`DirectoryEntry`]. Listing never fails from
//! the caller's point of view: an unreadable directory is logged and
//! reported as empty.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use protocol::{DirectoryEntry, EntryKind};
use thiserror::Error;
use tracing::{debug, warn};

use super::policy::{extension_of, DownloadPolicy};
use super::resolver::PathResolver;

/// Errors that can occur while reading a directory.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The requested path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory browser bound to a base directory.
///
/// Symlinks are skipped unless following is enabled; followed links must
/// still resolve inside the base.
#[derive(Debug, Clone)]
pub struct DirectoryBrowser {
    resolver: PathResolver,
    policy: DownloadPolicy,
    follow_symlinks: bool,
    exclude_name: Option<String>,
}

impl DirectoryBrowser {
    pub fn new(resolver: PathResolver, policy: DownloadPolicy) -> Self {
        Self {
            resolver,
            policy,
            follow_symlinks: false,
            exclude_name: None,
        }
    }

    /// Set whether to follow symlinks (default: false).
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Name hidden from the base directory listing, normally the
    /// executable serving it.
    pub fn exclude_name(mut self, name: Option<String>) -> Self {
        self.exclude_name = name;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn policy(&self) -> &DownloadPolicy {
        &self.policy
    }

    /// List the direct children of `dir`.
    ///
    /// Any error reading the directory itself is logged and yields an
    /// empty list.
    pub fn list_directory(&self, dir: &Path, show_hidden: bool) -> Vec<DirectoryEntry> {
        match self.read_entries(dir, show_hidden) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Directory read error");
                Vec::new()
            }
        }
    }

    fn read_entries(
        &self,
        dir: &Path,
        show_hidden: bool,
    ) -> Result<Vec<DirectoryEntry>, BrowserError> {
        let metadata = fs::metadata(dir)?;
        if !metadata.is_dir() {
            return Err(BrowserError::NotADirectory(dir.to_path_buf()));
        }

        let at_base = self.resolver.is_base(dir);
        let mut results = Vec::new();

        for entry_result in fs::read_dir(dir)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    debug!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();

            if !show_hidden && name.starts_with('.') {
                continue;
            }

            if at_base && self.exclude_name.as_deref() == Some(name.as_str()) {
                continue;
            }

            if let Some(described) = self.describe(&entry, name) {
                results.push(described);
            }
        }

        Ok(results)
    }

    /// Build the record for one child, or `None` if it must not be shown.
    fn describe(&self, entry: &fs::DirEntry, name: String) -> Option<DirectoryEntry> {
        let path = entry.path();
        let file_type = entry.file_type().ok()?;

        let metadata = if file_type.is_symlink() {
            if !self.follow_symlinks {
                return None;
            }
            // Followed links must land inside the base; broken links fail here too
            let target = self.resolver.contain(&path)?;
            fs::metadata(target).ok()?
        } else {
            entry.metadata().ok()?
        };

        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            debug!(path = %path.display(), "Skipping special file");
            return None;
        };

        let extension = match kind {
            EntryKind::Directory => String::new(),
            EntryKind::File => extension_of(&name),
        };

        let size = match kind {
            EntryKind::Directory => None,
            EntryKind::File => Some(metadata.len()),
        };

        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let downloadable = self.policy.is_downloadable(kind, &extension);

        Some(DirectoryEntry {
            name,
            kind,
            extension,
            size,
            modified,
            permissions: permission_string(metadata.mode()),
            downloadable,
        })
    }
}

/// Last four octal digits of a mode, e.g. `0o100644` -> `"0644"`.
pub fn permission_string(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}
