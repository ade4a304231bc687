//! # dirview Service Library
//!
//! Serves a single directory tree over HTTP as JSON listings and file
//! downloads, without ever letting a request reach outside that tree.
//!
//! ## Overview
//!
//! - **Path Resolution**: client paths are sanitized, canonicalized and
//!   confined to the base directory
//! - **Listing**: direct children with visibility rules, sorting, statistics
//!   and pagination
//! - **Downloads**: filename, token, type and symlink checks before a file
//!   handle is handed to the transport
//! - **Sessions**: one anti-forgery token per browser session
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                  api (axum router)                 │
//! ├────────────────────────────────────────────────────┤
//! │                    FileService                     │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────┐  │
//! │  │ PathResolver │ │   Directory  │ │  Download  │  │
//! │  │              │ │   Browser    │ │    Gate    │  │
//! │  └──────────────┘ └──────────────┘ └────────────┘  │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::api::{self, AppState};
//! use daemon::{Config, FileService};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let service = FileService::from_config(&config)?;
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()?).await?;
//!
//!     api::serve(listener, AppState::new(service), CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path resolution, listing, download policy and MIME types
//! - [`session`]: Anti-forgery tokens and the session store
//! - [`service`]: Browse and download pipelines
//! - [`api`]: HTTP routing

pub mod api;
pub mod config;
pub mod files;
pub mod service;
pub mod session;

// Re-export protocol for convenience
pub use protocol;

pub use config::{Config, ConfigError};
pub use files::{BaseDirectory, DirectoryBrowser, Download, DownloadGate, PathResolver};
pub use service::{BrowseRequest, DownloadRequest, FileService};
pub use session::{AntiForgeryToken, SessionStore};
