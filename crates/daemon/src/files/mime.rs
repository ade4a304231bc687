//! Content type detection for downloads.
//!
//! The configured extension table always wins. When it has no entry the
//! first bytes of the file are matched against a handful of well-known
//! signatures, then `mime_guess` is consulted, and finally the generic
//! binary type is used.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fallback type when nothing else matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Number of leading bytes inspected when sniffing.
const SNIFF_LEN: usize = 512;

/// Magic number table: (offset, signature, mime).
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"\x89PNG\r\n\x1a\n", "image/png"),
    (0, b"\xff\xd8\xff", "image/jpeg"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (0, b"%PDF-", "application/pdf"),
    (0, b"PK\x03\x04", "application/zip"),
    (0, b"\x1f\x8b", "application/gzip"),
    (0, b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (0, b"OggS", "audio/ogg"),
    (0, b"ID3", "audio/mpeg"),
    (0, b"\x7fELF", "application/x-executable"),
    (8, b"WEBP", "image/webp"),
    (8, b"WAVE", "audio/wav"),
    (4, b"ftyp", "video/mp4"),
];

/// Resolve the content type for a file that is about to be served.
pub fn resolve(table: &HashMap<String, String>, extension: &str, path: &Path) -> String {
    if let Some(mime) = table.get(extension) {
        return mime.clone();
    }

    if let Some(mime) = sniff(path) {
        return mime.to_string();
    }

    if !extension.is_empty() {
        if let Some(mime) = mime_guess::from_ext(extension).first() {
            return mime.essence_str().to_string();
        }
    }

    OCTET_STREAM.to_string()
}

/// Sniff a content type from the first bytes of a file.
///
/// Returns `None` when the file cannot be read or nothing conclusive matches.
pub fn sniff(path: &Path) -> Option<&'static str> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)
        .ok()?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .ok()?;
    sniff_bytes(&head)
}

/// Sniff a content type from a byte prefix.
pub fn sniff_bytes(head: &[u8]) -> Option<&'static str> {
    if head.is_empty() {
        return None;
    }

    for (offset, signature, mime) in SIGNATURES {
        if head.len() >= offset + signature.len()
            && &head[*offset..offset + signature.len()] == *signature
        {
            return Some(*mime);
        }
    }

    if looks_like_text(head) {
        return Some("text/plain");
    }

    None
}

/// UTF-8 without control characters other than common whitespace.
fn looks_like_text(head: &[u8]) -> bool {
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        // The prefix may cut a multi-byte character in half
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&head[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    !text.is_empty()
        && text
            .chars()
            .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t' | '\x0c'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff_bytes(b"\x89PNG\r\n\x1a\n\0\0"), Some("image/png"));
        assert_eq!(sniff_bytes(b"%PDF-1.7\n"), Some("application/pdf"));
        assert_eq!(sniff_bytes(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_bytes(b"\0\0\0\x18ftypmp42"), Some("video/mp4"));
    }

    #[test]
    fn test_sniff_text() {
        assert_eq!(sniff_bytes(b"hello\nworld\n"), Some("text/plain"));
        assert_eq!(sniff_bytes("héllo".as_bytes()), Some("text/plain"));
    }

    #[test]
    fn test_sniff_truncated_utf8_is_text() {
        let bytes = "abc é".as_bytes();
        assert_eq!(sniff_bytes(&bytes[..bytes.len() - 1]), Some("text/plain"));
    }

    #[test]
    fn test_sniff_inconclusive() {
        assert_eq!(sniff_bytes(b""), None);
        assert_eq!(sniff_bytes(b"\x00\x01\x02\x03\xfe"), None);
    }

    #[test]
    fn test_resolve_prefers_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        fs::write(&path, "not really json").unwrap();

        let mut table = HashMap::new();
        table.insert("json".to_string(), "application/json".to_string());

        assert_eq!(resolve(&table, "json", &path), "application/json");
    }

    #[test]
    fn test_resolve_falls_back_to_sniffing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image.bin");
        fs::write(&path, b"GIF89a\x01\x00").unwrap();

        assert_eq!(resolve(&HashMap::new(), "bin", &path), "image/gif");
    }

    #[test]
    fn test_resolve_falls_back_to_extension_guess() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("module.wasm");
        fs::write(&path, b"\x00asm\x01\x00\x00\x00").unwrap();

        assert_eq!(resolve(&HashMap::new(), "wasm", &path), "application/wasm");
    }

    #[test]
    fn test_resolve_generic_binary() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob");
        fs::write(&path, b"\x00\x01\x02\x03").unwrap();

        assert_eq!(resolve(&HashMap::new(), "", &path), OCTET_STREAM);
    }
}
