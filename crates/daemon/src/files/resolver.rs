//! Sandboxed resolution of client supplied paths.
//!
//! Every path a client sends is first sanitized into a [`NormalizedPath`]
//! (a plain list of segments with no `.` or `..`), then joined onto the
//! [`BaseDirectory`] and canonicalized. The canonical result must be the base
//! itself or sit below it; anything else is treated as an escape attempt.
//!
//! Browsing degrades an escape to the base directory. Downloads use
//! [`PathResolver::contain`] and treat `None` as a hard rejection.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors that can occur while establishing the base directory.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The configured root could not be canonicalized.
    #[error("base directory is not accessible: {path}: {source}")]
    BaseInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured root is not a directory.
    #[error("base directory is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Canonical absolute root of the sandbox.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirectory(PathBuf);

impl BaseDirectory {
    /// Canonicalize `path` and make sure it is a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).map_err(|source| ResolveError::BaseInaccessible {
            path: path.to_path_buf(),
            source,
        })?;

        if !canonical.is_dir() {
            return Err(ResolveError::NotADirectory(canonical));
        }

        Ok(Self(canonical))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Whether a canonical path is the base or one of its descendants.
    ///
    /// `Path::starts_with` compares whole components, so `/srv/www-evil` is
    /// not inside `/srv/www`.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.0)
    }
}

impl AsRef<Path> for BaseDirectory {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// A sanitized relative path: `/`-joined segments, none empty, `.` or `..`.
///
/// The empty path denotes the base directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitize an untrusted path string.
///
/// NUL bytes and backslashes become separators, empty segments disappear and
/// `.`/`..` segments are deleted outright rather than walking upwards, so
/// `"a/../c"` becomes `"a/c"`.
pub fn sanitize(raw: &str) -> NormalizedPath {
    let unified = raw.replace(['\0', '\\'], "/");
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect();
    NormalizedPath(segments.join("/"))
}

/// Resolves normalized paths against a fixed base directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base: BaseDirectory,
}

impl PathResolver {
    pub fn new(base: BaseDirectory) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseDirectory {
        &self.base
    }

    /// Whether `path` is exactly the base directory.
    pub fn is_base(&self, path: &Path) -> bool {
        path == self.base.path()
    }

    /// Resolve a normalized path, falling back to the base on any failure.
    pub fn resolve(&self, normalized: &NormalizedPath) -> PathBuf {
        if normalized.is_root() {
            return self.base.path().to_path_buf();
        }

        let mut joined = self.base.path().to_path_buf();
        joined.extend(normalized.segments());

        match self.contain(&joined) {
            Some(resolved) => resolved,
            None => {
                debug!(requested = %normalized, "path did not resolve inside base, using base");
                self.base.path().to_path_buf()
            }
        }
    }

    /// Sanitize and resolve a raw client string.
    pub fn resolve_raw(&self, raw: &str) -> PathBuf {
        self.resolve(&sanitize(raw))
    }

    /// Canonicalize `candidate` and return it only if it stays inside the base.
    ///
    /// Returns `None` when the path does not exist, cannot be read, or
    /// resolves (through `..` or symlinks) to somewhere outside the base.
    pub fn contain(&self, candidate: &Path) -> Option<PathBuf> {
        let canonical = fs::canonicalize(candidate).ok()?;
        if self.base.contains(&canonical) {
            Some(canonical)
        } else {
            debug!(
                candidate = %candidate.display(),
                resolved = %canonical.display(),
                "rejected path outside base"
            );
            None
        }
    }

    /// Express a resolved path relative to the base using `/` separators.
    ///
    /// Returns `""` for the base itself and for paths outside it.
    pub fn relative(&self, resolved: &Path) -> String {
        let Ok(rest) = resolved.strip_prefix(self.base.path()) else {
            return String::new();
        };
        rest.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
