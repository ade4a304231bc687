//! # dirview Protocol Library
//!
//! Client-facing data model for the dirview directory browser.
//!
//! ## Overview
//!
//! - **Listing Records**: [`DirectoryEntry`], [`ListingStats`] and the
//!   paginated [`Listing`] returned for a browse request
//! - **Sorting**: parsing of `sort=type,-size` specifications and the
//!   deterministic multi-key comparator
//! - **Rejections**: the closed set of reasons a download is refused, with
//!   their HTTP status codes
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{DirectoryEntry, EntryKind, SortSpec};
//!
//! let mut entries = vec![
//!     DirectoryEntry {
//!         name: "b.txt".to_string(),
//!         kind: EntryKind::File,
//!         extension: "txt".to_string(),
//!         size: Some(3),
//!         modified: 0,
//!         permissions: "0644".to_string(),
//!         downloadable: true,
//!     },
//!     DirectoryEntry {
//!         name: "A".to_string(),
//!         kind: EntryKind::Directory,
//!         extension: String::new(),
//!         size: None,
//!         modified: 0,
//!         permissions: "0755".to_string(),
//!         downloadable: false,
//!     },
//! ];
//!
//! SortSpec::parse("type,name").sort(&mut entries);
//! assert_eq!(entries[0].name, "A");
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Listing records
//! - [`sort`]: Sort specification and comparator
//! - [`error`]: Download rejections

pub mod error;
pub mod messages;
pub mod sort;

pub use error::{Rejection, RejectionKind};
pub use messages::{DirectoryEntry, EntryKind, Listing, ListingStats};
pub use sort::{natural_cmp, SortDirection, SortField, SortKey, SortSpec};
