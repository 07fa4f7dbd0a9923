//! Storage backend implementations.
//!
//! Backends report availability and attempt saves/loads; priority ordering
//! lives in the [`CredentialStore`](crate::CredentialStore), not here. Each
//! backend uses a distinct on-disk name so a chain rooted at one directory
//! never aliases files between backends.

use std::path::{Path, PathBuf};

use base64::Engine;
use ysh_common::{Error, Result};

/// A single credential storage strategy.
pub trait StorageBackend: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this backend can be attempted on this host.
    fn is_available(&self) -> bool;

    /// Persist `secret` under `key`.
    fn save(&self, key: &str, secret: &str) -> Result<()>;

    /// Read back the secret for `key`, `None` if this backend has no entry.
    fn load(&self, key: &str) -> Result<Option<String>>;
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Persistence(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Restrictive-permission file store.
///
/// Secrets live under `<dir>/secrets/` with 0o700 on the directory and 0o600
/// on each file, applied before the secret is written. This is the
/// highest-priority stand-in for a platform secure store; it is unavailable
/// on targets without unix permission bits.
pub struct SecureFileBackend {
    root: PathBuf,
}

impl SecureFileBackend {
    pub fn new(dir: &Path) -> Self {
        Self {
            root: dir.join("secrets"),
        }
    }

    fn entry(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl StorageBackend for SecureFileBackend {
    fn name(&self) -> &'static str {
        "secure-file"
    }

    fn is_available(&self) -> bool {
        cfg!(unix)
    }

    #[cfg(unix)]
    fn save(&self, key: &str, secret: &str) -> Result<()> {
        use std::io::Write;
        use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true).mode(0o700);
        builder
            .create(&self.root)
            .map_err(|e| Error::Persistence(format!("failed to create secrets dir: {e}")))?;

        let path = self.entry(key);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .map_err(|e| Error::Persistence(format!("failed to open {}: {e}", path.display())))?;
        file.write_all(secret.as_bytes())
            .map_err(|e| Error::Persistence(format!("failed to write {}: {e}", path.display())))
    }

    #[cfg(not(unix))]
    fn save(&self, _key: &str, _secret: &str) -> Result<()> {
        Err(Error::Persistence(
            "secure file backend requires unix permission bits".into(),
        ))
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        read_optional(&self.entry(key))
    }
}

/// Base64-obfuscated file store.
///
/// Obfuscation only: the encoding is trivially reversible and exists so the
/// secret is not greppable in plain text. Never treat this as encryption.
pub struct EncodedFileBackend {
    dir: PathBuf,
}

impl EncodedFileBackend {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn entry(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.b64"))
    }
}

impl StorageBackend for EncodedFileBackend {
    fn name(&self) -> &'static str {
        "encoded-file"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn save(&self, key: &str, secret: &str) -> Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(secret.as_bytes());
        let path = self.entry(key);
        std::fs::write(&path, encoded)
            .map_err(|e| Error::Persistence(format!("failed to write {}: {e}", path.display())))
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        let Some(encoded) = read_optional(&self.entry(key))? else {
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Persistence(format!("corrupt encoded credential: {e}")))?;
        let secret = String::from_utf8(bytes)
            .map_err(|e| Error::Persistence(format!("corrupt encoded credential: {e}")))?;
        Ok(Some(secret))
    }
}

/// Plaintext file store. Last resort; succeeds wherever the directory is
/// writable.
pub struct PlainFileBackend {
    dir: PathBuf,
}

impl PlainFileBackend {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn entry(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl StorageBackend for PlainFileBackend {
    fn name(&self) -> &'static str {
        "plain-file"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn save(&self, key: &str, secret: &str) -> Result<()> {
        let path = self.entry(key);
        std::fs::write(&path, secret)
            .map_err(|e| Error::Persistence(format!("failed to write {}: {e}", path.display())))
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        read_optional(&self.entry(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_backend_round_trips_non_ascii() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = EncodedFileBackend::new(tmp.path());
        backend.save("pw", "sécrét ☃").unwrap();
        assert_eq!(backend.load("pw").unwrap().as_deref(), Some("sécrét ☃"));
    }

    #[test]
    fn encoded_backend_does_not_store_raw_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = EncodedFileBackend::new(tmp.path());
        backend.save("pw", "hunter2").unwrap();
        let on_disk = std::fs::read_to_string(tmp.path().join("pw.b64")).unwrap();
        assert!(!on_disk.contains("hunter2"));
    }

    #[test]
    fn encoded_backend_rejects_corrupt_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = EncodedFileBackend::new(tmp.path());
        std::fs::write(tmp.path().join("pw.b64"), "!!! not base64 !!!").unwrap();
        assert!(backend.load("pw").is_err());
    }

    #[test]
    fn missing_entry_is_none_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(PlainFileBackend::new(tmp.path()).load("nope").unwrap(), None);
        assert_eq!(
            EncodedFileBackend::new(tmp.path()).load("nope").unwrap(),
            None
        );
        assert_eq!(
            SecureFileBackend::new(tmp.path()).load("nope").unwrap(),
            None
        );
    }

    #[cfg(unix)]
    #[test]
    fn secure_backend_applies_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let backend = SecureFileBackend::new(tmp.path());
        backend.save("pw", "hunter2").unwrap();

        let dir_mode = std::fs::metadata(tmp.path().join("secrets"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);

        let file_mode = std::fs::metadata(tmp.path().join("secrets/pw"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(backend.load("pw").unwrap().as_deref(), Some("hunter2"));
    }

    #[test]
    fn save_is_idempotent_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = PlainFileBackend::new(tmp.path());
        backend.save("pw", "first").unwrap();
        backend.save("pw", "second").unwrap();
        assert_eq!(backend.load("pw").unwrap().as_deref(), Some("second"));
    }
}
