//! Credential stores.
//!
//! The pipeline reads the store before every request and is the only writer
//! during renewal. Store operations are infallible from the caller's point of
//! view; the file-backed store keeps an in-memory copy and logs persistence
//! failures instead of surfacing them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::types::Credential;

/// Credential file name inside the config directory.
const CREDENTIAL_FILE: &str = "credential.json";

/// Application directory name.
const APP_DIR: &str = "pomotask";

/// Key/value persistence for the bearer credential.
pub trait CredentialStore: Send + Sync + 'static {
    /// Returns the current credential, if any.
    fn get(&self) -> Option<Credential>;

    /// Replaces the current credential.
    fn set(&self, credential: Credential);

    /// Removes the current credential.
    fn clear(&self);
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a credential.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credential: Credential) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    fn clear(&self) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// Credential store persisted as JSON on disk.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<Credential>>,
}

impl FileCredentialStore {
    /// Opens the store at `path`, loading any credential already saved.
    ///
    /// A missing or unreadable file is treated as "not logged in".
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = load(&path);
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    /// Returns the default credential file location.
    ///
    /// Uses the platform config directory, falling back to `$HOME/.pomotask`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(dir) = dirs::config_dir() {
            return Some(dir.join(APP_DIR).join(CREDENTIAL_FILE));
        }
        dirs::home_dir().map(|home| home.join(format!(".{APP_DIR}")).join(CREDENTIAL_FILE))
    }

    /// Returns the file path backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, credential: &Credential) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(credential)?;
        std::fs::write(&self.path, json)?;
        restrict_permissions(&self.path)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credential: Credential) {
        if let Err(e) = self.persist(&credential) {
            tracing::warn!(path = %self.path.display(), "認証情報の保存に失敗しました: {}", e);
        }
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    fn clear(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "認証情報の削除に失敗しました: {}", e);
            }
        }
    }
}

fn load(path: &Path) -> Option<Credential> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "認証情報を読み込めません: {}", e);
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(credential) => Some(credential),
        Err(e) => {
            tracing::warn!(path = %path.display(), "認証情報ファイルが壊れています: {}", e);
            None
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod memory_store_tests {
        use super::*;

        #[test]
        fn test_starts_empty() {
            let store = MemoryCredentialStore::new();
            assert!(store.get().is_none());
        }

        #[test]
        fn test_set_get_clear() {
            let store = MemoryCredentialStore::new();

            store.set(Credential::new("one"));
            assert_eq!(store.get(), Some(Credential::new("one")));

            store.set(Credential::new("two"));
            assert_eq!(store.get(), Some(Credential::new("two")));

            store.clear();
            assert!(store.get().is_none());
        }

        #[test]
        fn test_with_credential() {
            let store = MemoryCredentialStore::with_credential(Credential::new("seed"));
            assert_eq!(store.get(), Some(Credential::new("seed")));
        }
    }

    mod file_store_tests {
        use super::*;

        #[test]
        fn test_missing_file_means_no_credential() {
            let dir = tempfile::tempdir().unwrap();
            let store = FileCredentialStore::open(dir.path().join("credential.json"));
            assert!(store.get().is_none());
        }

        #[test]
        fn test_set_persists_across_reopen() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("credential.json");

            let store = FileCredentialStore::open(&path);
            store.set(Credential::new("persisted"));
            assert!(path.exists());

            let reopened = FileCredentialStore::open(&path);
            assert_eq!(reopened.get(), Some(Credential::new("persisted")));
        }

        #[test]
        fn test_file_format() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("credential.json");

            FileCredentialStore::open(&path).set(Credential::new("abc"));

            let content = std::fs::read_to_string(&path).unwrap();
            assert!(content.contains("\"access_token\": \"abc\""));
        }

        #[test]
        fn test_clear_removes_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("credential.json");

            let store = FileCredentialStore::open(&path);
            store.set(Credential::new("gone"));
            store.clear();

            assert!(store.get().is_none());
            assert!(!path.exists());
            // Clearing twice is fine.
            store.clear();
        }

        #[test]
        fn test_corrupt_file_is_ignored() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("credential.json");
            std::fs::write(&path, "not json").unwrap();

            let store = FileCredentialStore::open(&path);
            assert!(store.get().is_none());
        }

        #[cfg(unix)]
        #[test]
        fn test_file_is_owner_only() {
            use std::os::unix::fs::PermissionsExt;

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("credential.json");
            FileCredentialStore::open(&path).set(Credential::new("private"));

            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        #[test]
        fn test_default_path_file_name() {
            if let Some(path) = FileCredentialStore::default_path() {
                assert!(path.ends_with("credential.json"));
            }
        }
    }
}
