//! Filesystem side of dirview: path resolution, listing and downloads.
//!
//! # Security
//!
//! Every client supplied path is sanitized, canonicalized and checked to
//! remain under the base directory before it is touched. Symlinks are not
//! followed unless enabled, and even then must resolve inside the base.

pub mod browser;
pub mod mime;
pub mod policy;
pub mod resolver;
pub mod transfer;

pub use browser::{BrowserError, DirectoryBrowser};
pub use policy::{extension_of, DownloadPolicy};
pub use resolver::{sanitize, BaseDirectory, NormalizedPath, PathResolver, ResolveError};
pub use transfer::{Download, DownloadGate};
