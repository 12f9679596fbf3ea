//! Checksums for archival artifacts
//!
//! Master copies are recorded in the catalog together with their SHA-256
//! digest and size, so later integrity checks can detect silent corruption.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Digest and size of one file, as stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex SHA-256
    pub sha256: String,
    /// Size in bytes
    pub size: u64,
}

/// Compute the SHA-256 digest and byte count of any readable source
pub fn digest_reader<R: Read>(reader: &mut R) -> Result<FileDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(FileDigest {
        sha256: hex::encode(hasher.finalize()),
        size,
    })
}

/// Compute the SHA-256 digest and size of a file
pub fn digest_file(path: impl AsRef<Path>) -> Result<FileDigest> {
    let mut file = std::fs::File::open(path)?;
    digest_reader(&mut file)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::CommonError;
    use std::io::Cursor;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_digest_reader() {
        let mut cursor = Cursor::new(b"hello world");
        let digest = digest_reader(&mut cursor).unwrap();
        assert_eq!(digest.sha256, HELLO_WORLD_SHA256);
        assert_eq!(digest.size, 11);
    }

    #[test]
    fn test_digest_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let digest = digest_file(file.path()).unwrap();
        assert_eq!(digest.size, 0);
        assert_eq!(
            digest.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = digest_file("/definitely/not/here.odt").unwrap_err();
        assert!(matches!(err, CommonError::Io(_)));
    }
}
