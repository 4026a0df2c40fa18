//! Content-addressed storage for certificate material.
//!
//! Backends which only accept file paths for certificates and keys still
//! need to work with material the caller already holds in memory. The
//! [`CredentialStore`] writes such material to a file whose name is derived
//! from a SHA-256 digest of the content, so the same content always maps to
//! the same file and repeated requests reuse it.

use std::fmt;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Turns in-memory credential material into a file path.
pub trait CredentialStore: fmt::Debug + Send + Sync {
    /// Return the path of a file holding exactly `contents`.
    fn materialize(&self, contents: &[u8]) -> io::Result<PathBuf>;
}

/// A [`CredentialStore`] backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    directory: PathBuf,
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("courier"))
    }
}

impl FileCredentialStore {
    /// Store credential files in `directory`, which is created on demand.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory holding credential files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file name used for `contents`.
    pub fn file_name(contents: &[u8]) -> String {
        let digest = Sha256::digest(contents);
        let mut name = String::with_capacity(digest.len() * 2 + 20);
        name.push_str("credentials.");
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".pem");
        name
    }
}

impl CredentialStore for FileCredentialStore {
    fn materialize(&self, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.directory.join(Self::file_name(contents));
        if path.exists() {
            tracing::trace!(path = %path.display(), "reusing credential file");
            return Ok(path);
        }

        std::fs::create_dir_all(&self.directory)?;

        // Racing writers carry identical content.
        let mut file = tempfile::NamedTempFile::new_in(&self.directory)?;
        file.write_all(contents)?;
        file.flush()?;
        file.persist(&path).map_err(|error| error.error)?;

        tracing::debug!(path = %path.display(), "materialized credential file");
        Ok(path)
    }
}
