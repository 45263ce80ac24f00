//! Content digests used for change detection.
//!
//! A [`ContentDigest`] is a validated 64-character lowercase hex SHA-256
//! string. Collision resistance is not a security property here; the digest
//! only needs to notice that a file's bytes changed between runs.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated hex-encoded SHA-256 digest of an artifact's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest an in-memory buffer.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ContentDigest {
    type Error = PackagerError;

    fn try_from(value: &str) -> Result<Self> {
        validate_hex(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = PackagerError;

    fn try_from(value: String) -> Result<Self> {
        validate_hex(&value)?;
        Ok(Self(value))
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the SHA-256 digest of a file.
///
/// The file is streamed in chunks; its contents are not retained.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the file cannot be opened or read.
pub fn digest_file(path: &Utf8Path) -> Result<ContentDigest> {
    let mut file = fs::File::open(path).map_err(PackagerError::io(path))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(PackagerError::io(path))?;
        let Some(chunk) = buffer.get(..bytes_read) else {
            break;
        };
        if chunk.is_empty() {
            break;
        }
        hasher.update(chunk);
    }
    Ok(ContentDigest(format!("{:x}", hasher.finalize())))
}

fn validate_hex(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(PackagerError::InvalidDigest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !c.is_ascii_hexdigit() || c.is_ascii_uppercase())
    {
        return Err(PackagerError::InvalidDigest {
            reason: format!("unexpected character '{bad}'"),
        });
    }
    Ok(())
}
