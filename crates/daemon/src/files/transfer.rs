//! Download authorization.
//!
//! [`DownloadGate::authorize`] runs every check a download must pass and,
//! on success, hands back an open file handle together with the headers
//! needed to serve it. Checks run in a fixed order and the first failure
//! decides the rejection.

use std::fs::{self, File};
use std::path::Path;

use protocol::Rejection;
use tracing::{debug, info, warn};

use super::policy::{extension_of, DownloadPolicy};
use super::resolver::PathResolver;
use crate::session::AntiForgeryToken;

/// An authorized download.
///
/// Owns the open file; dropping it closes the handle.
#[derive(Debug)]
pub struct Download {
    /// Open handle positioned at the start of the file.
    pub file: File,
    /// Filename as requested by the client.
    pub filename: String,
    /// Content type to advertise.
    pub mime: String,
    /// Length in bytes at the time of the check.
    pub size: u64,
}

/// Validates download requests against the base directory and policy.
#[derive(Debug, Clone)]
pub struct DownloadGate {
    resolver: PathResolver,
    policy: DownloadPolicy,
    follow_symlinks: bool,
}

impl DownloadGate {
    pub fn new(resolver: PathResolver, policy: DownloadPolicy) -> Self {
        Self {
            resolver,
            policy,
            follow_symlinks: false,
        }
    }

    /// Set whether symlinked files may be downloaded (default: false).
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Authorize a download of `raw_filename` from `current_dir`.
    ///
    /// `current_dir` must already be resolved inside the base. The token is
    /// only checked when `state_changing` is set.
    pub fn authorize(
        &self,
        raw_filename: &str,
        current_dir: &Path,
        provided: Option<&str>,
        expected: &AntiForgeryToken,
        state_changing: bool,
    ) -> Result<Download, Rejection> {
        if !self.policy.enabled() {
            return Err(Rejection::DownloadsDisabled);
        }

        if state_changing && !expected.verify(provided) {
            warn!("Anti-forgery token mismatch");
            return Err(Rejection::AntiForgeryMismatch);
        }

        let filename = validate_filename(raw_filename)?;
        let joined = current_dir.join(filename);

        let resolved = self
            .resolver
            .contain(&joined)
            .ok_or(Rejection::PathEscape)?;

        let metadata = fs::metadata(&resolved).map_err(|_| Rejection::PathEscape)?;
        if !metadata.is_file() {
            return Err(Rejection::NotAFile);
        }

        if !self.follow_symlinks {
            let is_link = fs::symlink_metadata(&joined)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if is_link {
                debug!(filename, "Refusing symlinked download");
                return Err(Rejection::SymlinkBlocked);
            }
        }

        let extension = extension_of(filename);
        if self.policy.is_denied(&extension) {
            warn!(filename, extension = %extension, "Refusing denied file type");
            return Err(Rejection::ForbiddenExtension(extension));
        }

        let mime = self.policy.mime_type(&extension, &resolved);

        // The file may vanish between the checks above and here
        let file = File::open(&resolved).map_err(|e| {
            debug!(filename, error = %e, "Download target disappeared");
            Rejection::NotAFile
        })?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(metadata.len());

        info!(
            path = %self.resolver.relative(&resolved),
            size,
            mime = %mime,
            "Download authorized"
        );

        Ok(Download {
            file,
            filename: filename.to_string(),
            mime,
            size,
        })
    }
}

/// Accept only a bare file name: non-empty, equal to its own basename.
///
/// `.` and `..` count as bare names. They pass here and are refused later
/// because they never name a regular file.
fn validate_filename(raw: &str) -> Result<&str, Rejection> {
    if raw.is_empty() || raw.contains('\0') {
        return Err(Rejection::MalformedFilename);
    }
    if raw == "." || raw == ".." {
        return Ok(raw);
    }
    match Path::new(raw).file_name().and_then(|n| n.to_str()) {
        Some(name) if name == raw => Ok(name),
        _ => Err(Rejection::MalformedFilename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::resolver::BaseDirectory;
    use std::collections::HashMap;
    use std::io::Read;
    use std::os::unix::fs::symlink;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TOKEN: &str = "0123456789abcdef";

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn gate_for(dir: &Path) -> (DownloadGate, PathBuf) {
        let base = BaseDirectory::new(dir).unwrap();
        let base_path = base.path().to_path_buf();
        let gate = DownloadGate::new(PathResolver::new(base), DownloadPolicy::default());
        (gate, base_path)
    }

    fn token() -> AntiForgeryToken {
        AntiForgeryToken::from_hex(TOKEN)
    }

    #[test]
    fn test_authorize_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let content = b"Hello, World!";
        create_test_file(temp_dir.path(), "test.txt", content);

        let (gate, base) = gate_for(temp_dir.path());
        let mut download = gate
            .authorize("test.txt", &base, None, &token(), false)
            .unwrap();

        assert_eq!(download.filename, "test.txt");
        assert_eq!(download.mime, "text/plain");
        assert_eq!(download.size, content.len() as u64);

        let mut data = Vec::new();
        download.file.read_to_end(&mut data).unwrap();
        assert_eq!(data, content);
    }

    #[test]
    fn test_authorize_in_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        create_test_file(&temp_dir.path().join("docs"), "a.pdf", b"%PDF-1.4");

        let (gate, base) = gate_for(temp_dir.path());
        let download = gate
            .authorize("a.pdf", &base.join("docs"), None, &token(), false)
            .unwrap();
        assert_eq!(download.mime, "application/pdf");
    }

    #[test]
    fn test_traversal_filename_is_bad_request() {
        let temp_dir = TempDir::new().unwrap();
        let (gate, base) = gate_for(temp_dir.path());

        for raw in ["../secret.txt", "../..", "", "a/b.txt", "/etc/passwd", "name/"] {
            let result = gate.authorize(raw, &base, None, &token(), false);
            assert_eq!(
                result.unwrap_err(),
                Rejection::MalformedFilename,
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_dot_names_are_not_found() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        let (gate, base) = gate_for(temp_dir.path());

        // "." is the listed directory itself
        let err = gate.authorize(".", &base, None, &token(), false).unwrap_err();
        assert_eq!(err, Rejection::NotAFile);

        // ".." from the base leaves it
        let err = gate.authorize("..", &base, None, &token(), false).unwrap_err();
        assert_eq!(err, Rejection::PathEscape);
        assert_eq!(err.status_code(), 404);

        // ".." from a subdirectory is the base, still a directory
        let err = gate
            .authorize("..", &base.join("docs"), None, &token(), false)
            .unwrap_err();
        assert_eq!(err, Rejection::NotAFile);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_denied_extension_is_forbidden() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "shell.php", b"<?php echo 1;");

        let (gate, base) = gate_for(temp_dir.path());
        let err = gate
            .authorize("shell.php", &base, None, &token(), false)
            .unwrap_err();

        assert_eq!(err, Rejection::ForbiddenExtension("php".to_string()));
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_denied_extension_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "RUN.EXE", b"MZ");

        let (gate, base) = gate_for(temp_dir.path());
        assert!(matches!(
            gate.authorize("RUN.EXE", &base, None, &token(), false),
            Err(Rejection::ForbiddenExtension(_))
        ));
    }

    #[test]
    fn test_token_checked_for_state_changing_requests() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "test.txt", b"data");

        let (gate, base) = gate_for(temp_dir.path());

        let err = gate
            .authorize("test.txt", &base, Some("wrong"), &token(), true)
            .unwrap_err();
        assert_eq!(err, Rejection::AntiForgeryMismatch);
        assert_eq!(err.status_code(), 403);

        assert_eq!(
            gate.authorize("test.txt", &base, None, &token(), true)
                .unwrap_err(),
            Rejection::AntiForgeryMismatch
        );

        assert!(gate
            .authorize("test.txt", &base, Some(TOKEN), &token(), true)
            .is_ok());
    }

    #[test]
    fn test_token_checked_before_filename() {
        let temp_dir = TempDir::new().unwrap();
        let (gate, base) = gate_for(temp_dir.path());

        assert_eq!(
            gate.authorize("../x", &base, Some("wrong"), &token(), true)
                .unwrap_err(),
            Rejection::AntiForgeryMismatch
        );
    }

    #[test]
    fn test_token_ignored_for_safe_requests() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "test.txt", b"data");

        let (gate, base) = gate_for(temp_dir.path());
        assert!(gate
            .authorize("test.txt", &base, Some("wrong"), &token(), false)
            .is_ok());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let (gate, base) = gate_for(temp_dir.path());

        let err = gate
            .authorize("nonexistent.txt", &base, None, &token(), false)
            .unwrap_err();
        assert_eq!(err, Rejection::PathEscape);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_directory_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("subdir")).unwrap();

        let (gate, base) = gate_for(temp_dir.path());
        let err = gate
            .authorize("subdir", &base, None, &token(), false)
            .unwrap_err();
        assert_eq!(err, Rejection::NotAFile);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_symlink_blocked_when_not_following() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "real.txt", b"data");
        symlink(temp_dir.path().join("real.txt"), temp_dir.path().join("link.txt")).unwrap();

        let (gate, base) = gate_for(temp_dir.path());
        let err = gate
            .authorize("link.txt", &base, None, &token(), false)
            .unwrap_err();
        assert_eq!(err, Rejection::SymlinkBlocked);
        assert_eq!(err.status_code(), 404);

        let gate = gate.follow_symlinks(true);
        assert!(gate
            .authorize("link.txt", &base, None, &token(), false)
            .is_ok());
    }

    #[test]
    fn test_symlink_outside_base_not_found_even_when_following() {
        let temp_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        create_test_file(other_dir.path(), "secret.txt", b"Secret");
        symlink(other_dir.path().join("secret.txt"), temp_dir.path().join("sneaky.txt")).unwrap();

        let (gate, base) = gate_for(temp_dir.path());
        let gate = gate.follow_symlinks(true);
        assert_eq!(
            gate.authorize("sneaky.txt", &base, None, &token(), false)
                .unwrap_err(),
            Rejection::PathEscape
        );
    }

    #[test]
    fn test_downloads_disabled() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "test.txt", b"data");

        let base = BaseDirectory::new(temp_dir.path()).unwrap();
        let base_path = base.path().to_path_buf();
        let policy = DownloadPolicy::new(false, Vec::new(), HashMap::new());
        let gate = DownloadGate::new(PathResolver::new(base), policy);

        let err = gate
            .authorize("test.txt", &base_path, None, &token(), false)
            .unwrap_err();
        assert_eq!(err, Rejection::DownloadsDisabled);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_configured_mime_wins() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "data.custom", b"plain words");

        let base = BaseDirectory::new(temp_dir.path()).unwrap();
        let base_path = base.path().to_path_buf();
        let mut mime = HashMap::new();
        mime.insert("custom".to_string(), "application/x-custom".to_string());
        let gate = DownloadGate::new(PathResolver::new(base), DownloadPolicy::new(true, Vec::new(), mime));

        let download = gate
            .authorize("data.custom", &base_path, None, &token(), false)
            .unwrap();
        assert_eq!(download.mime, "application/x-custom");
    }
}
