//! Listing message definitions for dirview.
//!
//! This module defines the records handed to clients when a directory is
//! browsed. All messages are serialized as JSON by the daemon.

use serde::{Deserialize, Serialize};

use crate::sort::SortSpec;

/// Kind of a listed entry.
///
/// Symlinks never surface as their own kind: they are either skipped or
/// reported as the kind of their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Directory.
    Directory,
    /// Regular file.
    File,
}

impl EntryKind {
    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// A single file or directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry kind, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Lowercased extension, empty for directories.
    pub extension: String,
    /// Size in bytes, `None` for directories.
    pub size: Option<u64>,
    /// Last modified timestamp (Unix epoch seconds).
    pub modified: u64,
    /// Last four octal digits of the mode bits, e.g. `"0644"`.
    pub permissions: String,
    /// Whether the download gate would serve this entry.
    pub downloadable: bool,
}

impl DirectoryEntry {
    /// Size used for ordering: directories map to -1.
    pub fn sort_size(&self) -> i128 {
        self.size.map(i128::from).unwrap_or(-1)
    }
}

/// Aggregate counts over a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingStats {
    /// Number of entries.
    pub total: usize,
    /// Number of directories.
    pub folders: usize,
    /// Number of files.
    pub files: usize,
    /// Sum of file sizes in bytes.
    pub total_size: u64,
}

impl ListingStats {
    /// Compute stats for a set of entries.
    pub fn from_entries(entries: &[DirectoryEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut stats, entry| {
            stats.total += 1;
            match entry.kind {
                EntryKind::Directory => stats.folders += 1,
                EntryKind::File => {
                    stats.files += 1;
                    stats.total_size += entry.size.unwrap_or(0);
                }
            }
            stats
        })
    }
}

/// Response to a browse request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Resolved directory relative to the base, `/`-separated, `""` for root.
    pub path: String,
    /// Relative path of the parent directory, `None` at the root.
    pub parent: Option<String>,
    /// Ordered entries for the requested page.
    pub entries: Vec<DirectoryEntry>,
    /// Stats over every visible entry, not only this page.
    pub stats: ListingStats,
    /// Canonical form of the sort spec that was applied.
    pub sort: String,
    /// Current page, 1-based.
    pub page: usize,
    /// Number of pages, at least 1.
    pub total_pages: usize,
    /// Anti-forgery token the client must echo on state-changing requests.
    pub csrf_token: String,
}

/// Compute the parent of a `/`-separated relative path.
pub fn parent_of(relative: &str) -> Option<String> {
    if relative.is_empty() {
        return None;
    }
    Some(
        relative
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_default(),
    )
}

/// Slice sorted entries down to one page, returning `(entries, page, total_pages)`.
pub fn paginate(
    entries: Vec<DirectoryEntry>,
    page: usize,
    per_page: usize,
) -> (Vec<DirectoryEntry>, usize, usize) {
    let per_page = per_page.max(1);
    let total_pages = entries.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let entries = entries.into_iter().skip(start).take(per_page).collect();
    (entries, page, total_pages)
}

impl Listing {
    /// Assemble a listing from already sorted entries.
    pub fn new(
        path: String,
        sorted: Vec<DirectoryEntry>,
        spec: &SortSpec,
        page: usize,
        per_page: usize,
        csrf_token: String,
    ) -> Self {
        let stats = ListingStats::from_entries(&sorted);
        let parent = parent_of(&path);
        let (entries, page, total_pages) = paginate(sorted, page, per_page);
        Self {
            path,
            parent,
            entries,
            stats,
            sort: spec.to_string(),
            page,
            total_pages,
            csrf_token,
        }
    }
}
