//! File service wiring the resolver, browser and download gate together.
//!
//! [`FileService`] is built once from the configuration and shared by all
//! request handlers. Its methods are synchronous and touch the filesystem
//! directly; async callers run them on a blocking thread.

use protocol::{Listing, Rejection, SortSpec};
use tracing::debug;

use crate::config::Config;
use crate::files::{
    BaseDirectory, DirectoryBrowser, Download, DownloadGate, DownloadPolicy, PathResolver,
    ResolveError,
};
use crate::session::AntiForgeryToken;

/// Parameters of a listing request, already extracted from the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseRequest {
    /// Raw directory path relative to the base.
    pub path: Option<String>,
    /// Raw sort specification such as `"type,-size"`.
    pub sort: Option<String>,
    /// Whether dot files were requested.
    pub show_hidden: bool,
    /// 1-based page number; out of range values are clamped.
    pub page: usize,
}

/// Parameters of a download request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Raw directory path relative to the base.
    pub path: Option<String>,
    /// Requested file name within that directory.
    pub filename: String,
    /// Anti-forgery token sent by the client, if any.
    pub provided_token: Option<String>,
    /// Whether the transport method may change state.
    pub state_changing: bool,
}

/// Read-only view of one base directory.
#[derive(Debug, Clone)]
pub struct FileService {
    resolver: PathResolver,
    browser: DirectoryBrowser,
    gate: DownloadGate,
    items_per_page: usize,
    show_hidden_key: String,
}

impl FileService {
    /// Build the service for `config.server.root_dir`.
    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        let base = BaseDirectory::new(&config.server.root_dir)?;
        let resolver = PathResolver::new(base);
        let policy = DownloadPolicy::from_config(&config.download);

        let browser = DirectoryBrowser::new(resolver.clone(), policy.clone())
            .follow_symlinks(config.browse.follow_symlinks)
            .exclude_name(config.browse.effective_exclude_name());
        let gate =
            DownloadGate::new(resolver.clone(), policy).follow_symlinks(config.browse.follow_symlinks);

        Ok(Self {
            resolver,
            browser,
            gate,
            items_per_page: config.browse.items_per_page,
            show_hidden_key: config.browse.show_hidden_key.clone(),
        })
    }

    pub fn base(&self) -> &BaseDirectory {
        self.resolver.base()
    }

    /// Query parameter that toggles hidden entries.
    pub fn show_hidden_key(&self) -> &str {
        &self.show_hidden_key
    }

    /// List one directory.
    ///
    /// Unresolvable paths fall back to the base, so this always produces a
    /// listing. The token is echoed so the client can send it back.
    pub fn browse(&self, request: &BrowseRequest, token: &AntiForgeryToken) -> Listing {
        let dir = self
            .resolver
            .resolve_raw(request.path.as_deref().unwrap_or_default());
        let relative = self.resolver.relative(&dir);

        let spec = request
            .sort
            .as_deref()
            .map(SortSpec::parse)
            .unwrap_or_default();

        let mut entries = self.browser.list_directory(&dir, request.show_hidden);
        spec.sort(&mut entries);

        debug!(
            path = %relative,
            entries = entries.len(),
            sort = %spec,
            "Listed directory"
        );

        Listing::new(
            relative,
            entries,
            &spec,
            request.page,
            self.items_per_page,
            token.as_str().to_string(),
        )
    }

    /// Authorize a download from the requested directory.
    pub fn download(
        &self,
        request: &DownloadRequest,
        expected: &AntiForgeryToken,
    ) -> Result<Download, Rejection> {
        let dir = self
            .resolver
            .resolve_raw(request.path.as_deref().unwrap_or_default());

        self.gate.authorize(
            &request.filename,
            &dir,
            request.provided_token.as_deref(),
            expected,
            request.state_changing,
        )
    }
}
