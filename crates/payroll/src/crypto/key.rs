//! Long-lived symmetric key management.
//!
//! The key is created once, on first use, and read back verbatim on every
//! later start. It is never derived from user input and never regenerated
//! while a key file exists.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use rand::{rngs::OsRng, RngCore};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Length in bytes of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Handle to the process-wide encryption key.
///
/// Constructed once during start-up and passed by reference to whatever
/// needs to encrypt or decrypt. The bytes are immutable after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Generate a fresh random key without persisting it.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Build a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyInvalid`] if `bytes` is not exactly [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| Error::KeyInvalid {
            path: origin.to_path_buf(),
            message: format!("expected {KEY_LEN} bytes, got {}", bytes.len()),
        })?;
        Ok(Self { bytes })
    }

    /// Load the key stored at `path`, creating it first if the file is absent.
    ///
    /// A newly created key file is written with owner-only permissions on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyIo`] if the file cannot be created or read, and
    /// [`Error::KeyInvalid`] if an existing file does not hold a key.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read(path) {
            Ok(bytes) => {
                let key = Self::from_bytes(&bytes, path)?;
                debug!(
                    fingerprint = %key.fingerprint(),
                    "Loaded encryption key from {}",
                    path.display()
                );
                Ok(key)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Self::create(path),
            Err(source) => Err(Error::KeyIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn create(path: &Path) -> Result<Self> {
        let key_io = |source| Error::KeyIo {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(key_io)?;

        // The key only appears at `path` once it is complete on disk.
        let mut tmp = NamedTempFile::new_in(parent).map_err(key_io)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(key_io)?;
        }

        let key = Self::generate();
        tmp.write_all(&key.bytes).map_err(key_io)?;
        tmp.as_file().sync_all().map_err(key_io)?;

        match tmp.persist_noclobber(path) {
            Ok(_) => {}
            // Another process won the race; its key is the one to use.
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                return Self::load_or_create(path);
            }
            Err(err) => return Err(key_io(err.error)),
        }

        info!(
            fingerprint = %key.fingerprint(),
            "Created new encryption key at {}",
            path.display()
        );
        Ok(key)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Short, non-secret identifier for the key, safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        blake3::hash(&self.bytes).to_hex()[..16].to_string()
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_keys() {
        let a = EncryptionKey::generate();
        let b = EncryptionKey::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_load_or_create_creates_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");

        let created = EncryptionKey::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap().len(), KEY_LEN);

        let loaded = EncryptionKey::load_or_create(&path).unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn test_load_or_create_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/keys/secret.key");

        EncryptionKey::load_or_create(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_create_leaves_only_the_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        EncryptionKey::load_or_create(&path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, [std::ffi::OsString::from("secret.key")]);
    }

    #[test]
    fn test_create_never_clobbers_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, [9u8; KEY_LEN]).unwrap();

        // A writer that lost the race reads the winner's key back.
        let key = EncryptionKey::create(&path).unwrap();
        assert_eq!(key.as_bytes(), &[9u8; KEY_LEN]);
        assert_eq!(std::fs::read(&path).unwrap(), [9u8; KEY_LEN]);
    }

    #[test]
    fn test_existing_file_is_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, [7u8; KEY_LEN]).unwrap();

        let key = EncryptionKey::load_or_create(&path).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; KEY_LEN]);
    }

    #[test]
    fn test_wrong_length_is_rejected_not_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, b"too short").unwrap();

        let err = EncryptionKey::load_or_create(&path).unwrap_err();
        assert!(matches!(err, Error::KeyInvalid { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"too short");
    }

    #[test]
    fn test_unreadable_path_is_key_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the key path cannot be read as a file.
        let err = EncryptionKey::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, Error::KeyIo { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        EncryptionKey::load_or_create(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_does_not_leak_bytes() {
        let key = EncryptionKey::from_bytes(&[0xAB; KEY_LEN], Path::new("mem")).unwrap();
        let debug_str = format!("{key:?}");
        assert!(debug_str.contains("fingerprint"));
        assert!(!debug_str.contains("bytes"));
        assert_eq!(key.fingerprint().len(), 16);
    }
}
