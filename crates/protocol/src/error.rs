//! Rejection types for the download pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a rejection, mirroring the HTTP status it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    BadRequest,
    Forbidden,
    NotFound,
}

impl RejectionKind {
    /// HTTP status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
        }
    }
}

/// Reason a download request was refused.
///
/// The display string is the short plain-text body sent to the client, so
/// it never includes filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Downloads are switched off in the configuration.
    #[error("Not found")]
    DownloadsDisabled,

    /// The anti-forgery token was missing or wrong.
    #[error("Invalid request")]
    AntiForgeryMismatch,

    /// The filename was empty or contained a path separator.
    #[error("Invalid filename")]
    MalformedFilename,

    /// The target left the base directory or does not exist.
    #[error("File not found")]
    PathEscape,

    /// The target exists but is not a regular file.
    #[error("File not found")]
    NotAFile,

    /// The target is a symlink and symlinks are not followed.
    #[error("File not found")]
    SymlinkBlocked,

    /// The extension is on the denylist.
    #[error("File type not allowed")]
    ForbiddenExtension(String),
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MalformedFilename => RejectionKind::BadRequest,
            Self::AntiForgeryMismatch | Self::ForbiddenExtension(_) => RejectionKind::Forbidden,
            Self::DownloadsDisabled | Self::PathEscape | Self::NotAFile | Self::SymlinkBlocked => {
                RejectionKind::NotFound
            }
        }
    }

    /// HTTP status code for this rejection.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}
