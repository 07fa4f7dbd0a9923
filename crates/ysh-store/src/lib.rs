//! Credential persistence with ordered backend fallback.
//!
//! A secret is saved through a priority-ordered chain of storage backends:
//! restrictive-permission file → base64-obfuscated file → plaintext file.
//! Each backend attempt that fails is absorbed and the next backend is tried;
//! callers only see the aggregate outcome. Read-back mirrors the same order.
//!
//! None of the bundled backends is cryptographically secure. The encoded
//! backend in particular is obfuscation only; treat anything it writes as
//! readable by whoever can read the file.

pub mod backends;

pub use backends::{EncodedFileBackend, PlainFileBackend, SecureFileBackend, StorageBackend};

/// Ordered chain of storage backends.
///
/// The store owns the ordering; backends know nothing about each other.
pub struct CredentialStore {
    backends: Vec<Box<dyn StorageBackend>>,
}

impl CredentialStore {
    /// Build a store with a custom backend chain, tried in the given order.
    pub fn new(backends: Vec<Box<dyn StorageBackend>>) -> Self {
        Self { backends }
    }

    /// Default chain rooted at `dir`: secure file → encoded file → plaintext.
    pub fn with_default_chain(dir: &std::path::Path) -> Self {
        Self::new(vec![
            Box::new(SecureFileBackend::new(dir)),
            Box::new(EncodedFileBackend::new(dir)),
            Box::new(PlainFileBackend::new(dir)),
        ])
    }

    /// Persist `secret` under `key`.
    ///
    /// Returns true iff some backend saved it. Backend failures are logged
    /// and swallowed; the next backend in the chain is tried.
    pub fn save(&self, key: &str, secret: &str) -> bool {
        for backend in &self.backends {
            if !backend.is_available() {
                tracing::debug!(backend = backend.name(), "backend unavailable, skipping");
                continue;
            }
            match backend.save(key, secret) {
                Ok(()) => {
                    tracing::debug!(backend = backend.name(), key, "credential persisted");
                    return true;
                }
                Err(e) => {
                    tracing::debug!(backend = backend.name(), error = %e, "backend save failed, trying next");
                }
            }
        }
        tracing::warn!(key, "no backend could persist the credential");
        false
    }

    /// Read `key` back, mirroring the save order. Idempotent.
    pub fn load(&self, key: &str) -> Option<String> {
        for backend in &self.backends {
            if !backend.is_available() {
                continue;
            }
            match backend.load(key) {
                Ok(Some(secret)) => return Some(secret),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(backend = backend.name(), error = %e, "backend load failed, trying next");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ysh_common::{Error, Result};

    /// Backend that always fails, for exercising the fallback path.
    struct FailingBackend;

    impl StorageBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn save(&self, _key: &str, _secret: &str) -> Result<()> {
            Err(Error::Persistence("backend is broken".into()))
        }

        fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Persistence("backend is broken".into()))
        }
    }

    /// Backend that reports itself unavailable.
    struct AbsentBackend;

    impl StorageBackend for AbsentBackend {
        fn name(&self) -> &'static str {
            "absent"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn save(&self, _key: &str, _secret: &str) -> Result<()> {
            panic!("save called on unavailable backend");
        }

        fn load(&self, _key: &str) -> Result<Option<String>> {
            panic!("load called on unavailable backend");
        }
    }

    #[test]
    fn default_chain_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_default_chain(tmp.path());
        assert!(store.save("yay_password", "hunter2"));
        assert_eq!(store.load("yay_password").as_deref(), Some("hunter2"));
    }

    #[test]
    fn failing_backend_falls_through() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(vec![
            Box::new(FailingBackend),
            Box::new(PlainFileBackend::new(tmp.path())),
        ]);
        assert!(store.save("k", "secret value"));
        assert_eq!(store.load("k").as_deref(), Some("secret value"));
    }

    #[test]
    fn unavailable_backend_is_skipped_without_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(vec![
            Box::new(AbsentBackend),
            Box::new(PlainFileBackend::new(tmp.path())),
        ]);
        assert!(store.save("k", "v"));
        assert_eq!(store.load("k").as_deref(), Some("v"));
    }

    #[test]
    fn empty_chain_reports_failure() {
        let store = CredentialStore::new(vec![]);
        assert!(!store.save("k", "v"));
        assert_eq!(store.load("k"), None);
    }

    #[test]
    fn plaintext_only_chain_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(vec![Box::new(PlainFileBackend::new(tmp.path()))]);
        assert!(store.save("yay_password", "päßwörd"));
        assert_eq!(store.load("yay_password").as_deref(), Some("päßwörd"));
    }

    #[test]
    fn load_missing_key_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_default_chain(tmp.path());
        assert_eq!(store.load("never_saved"), None);
    }
}
