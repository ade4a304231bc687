//! Anti-forgery tokens.

use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// A 256-bit random token, hex encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct AntiForgeryToken(String);

impl AntiForgeryToken {
    /// Generate a fresh token from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap an existing hex string.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare a client supplied value against this token.
    ///
    /// Both sides are hashed first so the comparison always covers 32 bytes
    /// regardless of the input length, and the fold does not short-circuit.
    pub fn verify(&self, provided: Option<&str>) -> bool {
        let Some(provided) = provided else {
            return false;
        };
        let expected = Sha256::digest(self.0.as_bytes());
        let actual = Sha256::digest(provided.as_bytes());
        expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

// Keep the secret out of logs.
impl fmt::Debug for AntiForgeryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AntiForgeryToken(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_hex_256_bit() {
        let token = AntiForgeryToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(AntiForgeryToken::generate(), AntiForgeryToken::generate());
    }

    #[test]
    fn test_verify() {
        let token = AntiForgeryToken::from_hex("abc123");
        assert!(token.verify(Some("abc123")));
        assert!(!token.verify(Some("abc124")));
        assert!(!token.verify(Some("abc12")));
        assert!(!token.verify(Some("")));
        assert!(!token.verify(None));
    }

    #[test]
    fn test_debug_hides_value() {
        let token = AntiForgeryToken::from_hex("deadbeef");
        assert!(!format!("{token:?}").contains("deadbeef"));
    }
}
