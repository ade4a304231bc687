//! Shared state for request handlers.

use std::sync::Arc;

use crate::service::FileService;
use crate::session::SessionStore;

/// State cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Filesystem operations for the configured root.
    pub service: Arc<FileService>,
    /// Anti-forgery tokens keyed by session cookie.
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(service: FileService) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
