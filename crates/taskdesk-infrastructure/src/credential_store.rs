//! Credential store implementations.
//!
//! Both stores keep the same namespaced key/value document; they differ only
//! in where the document lives. Every multi-key operation is a single
//! read-modify-write of that document, so no partial update is observable.

use crate::storage::credential_document::{self as doc, CredentialDocument, CredentialKeys};
use crate::storage::{AtomicFile, FileFormat};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use taskdesk_core::session::{CredentialStore, StoredCredentials, UserProfile};
use taskdesk_core::{Result, TaskdeskError};

/// Where a [`KeyValueCredentialStore`] keeps its document.
pub trait DocumentBackend: Send + Sync {
    fn read(&self) -> Result<CredentialDocument>;

    fn modify<R>(&self, f: impl FnOnce(&mut CredentialDocument) -> Result<R>) -> Result<R>;
}

/// A JSON file, written atomically under an exclusive lock with owner-only
/// permissions.
pub struct FileBackend {
    file: AtomicFile<CredentialDocument>,
}

impl DocumentBackend for FileBackend {
    fn read(&self) -> Result<CredentialDocument> {
        Ok(self.file.load()?.unwrap_or_default())
    }

    fn modify<R>(&self, f: impl FnOnce(&mut CredentialDocument) -> Result<R>) -> Result<R> {
        self.file.update(CredentialDocument::new(), |document| {
            let mut draft = document.clone();
            let result = f(&mut draft)?;
            *document = draft;
            Ok(result)
        })?
    }
}

/// Process-local storage that disappears with the process.
#[derive(Default)]
pub struct MemoryBackend {
    document: Mutex<CredentialDocument>,
}

impl DocumentBackend for MemoryBackend {
    fn read(&self) -> Result<CredentialDocument> {
        self.document
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| TaskdeskError::storage("credential document lock poisoned"))
    }

    fn modify<R>(&self, f: impl FnOnce(&mut CredentialDocument) -> Result<R>) -> Result<R> {
        let mut guard = self
            .document
            .lock()
            .map_err(|_| TaskdeskError::storage("credential document lock poisoned"))?;
        // Work on a copy so a failing update leaves the document untouched.
        let mut draft = guard.clone();
        let result = f(&mut draft)?;
        *guard = draft;
        Ok(result)
    }
}

/// [`CredentialStore`] over a namespaced key/value document.
pub struct KeyValueCredentialStore<B> {
    backend: B,
    keys: CredentialKeys,
}

/// Credentials persisted to disk.
pub type FileCredentialStore = KeyValueCredentialStore<FileBackend>;

/// Credentials kept in memory only.
pub type MemoryCredentialStore = KeyValueCredentialStore<MemoryBackend>;

impl KeyValueCredentialStore<FileBackend> {
    /// Opens (without creating) the credential file at `path`.
    pub fn open(path: PathBuf, namespace: &str) -> Self {
        Self {
            backend: FileBackend {
                file: AtomicFile::new(path, FileFormat::Json).private(),
            },
            keys: CredentialKeys::new(namespace),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.backend.file.path()
    }
}

impl KeyValueCredentialStore<MemoryBackend> {
    pub fn new(namespace: &str) -> Self {
        Self {
            backend: MemoryBackend::default(),
            keys: CredentialKeys::new(namespace),
        }
    }

    /// Starts out holding `credentials`.
    pub fn with_credentials(namespace: &str, credentials: &StoredCredentials) -> Result<Self> {
        let store = Self::new(namespace);
        store
            .backend
            .modify(|d| doc::write_all(d, &store.keys, credentials))?;
        Ok(store)
    }
}

impl<B: DocumentBackend> KeyValueCredentialStore<B> {
    pub fn keys(&self) -> &CredentialKeys {
        &self.keys
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.backend.modify(|d| {
            d.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }
}

#[async_trait]
impl<B: DocumentBackend> CredentialStore for KeyValueCredentialStore<B> {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(doc::read_string(&self.backend.read()?, &self.keys.access_token))
    }

    async fn set_access_token(&self, token: &str) -> Result<()> {
        self.set_string(&self.keys.access_token, token)
    }

    async fn refresh_token(&self) -> Result<Option<String>> {
        Ok(doc::read_string(&self.backend.read()?, &self.keys.refresh_token))
    }

    async fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.set_string(&self.keys.refresh_token, token)
    }

    async fn first_time_login(&self) -> Result<bool> {
        Ok(doc::read_flag(&self.backend.read()?, &self.keys.first_time_login))
    }

    async fn set_first_time_login(&self, value: bool) -> Result<()> {
        self.backend.modify(|d| {
            doc::write_flag(d, &self.keys.first_time_login, value);
            Ok(())
        })
    }

    async fn user_profile(&self) -> Result<Option<UserProfile>> {
        Ok(doc::read_profile(&self.backend.read()?, &self.keys.user_profile))
    }

    async fn set_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.backend
            .modify(|d| doc::write_profile(d, &self.keys.user_profile, profile))
    }

    async fn load(&self) -> Result<StoredCredentials> {
        Ok(doc::read_all(&self.backend.read()?, &self.keys))
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        self.backend
            .modify(|d| doc::write_all(d, &self.keys, credentials))?;
        tracing::debug!(
            has_user = credentials.user_profile.is_some(),
            "Persisted credentials"
        );
        Ok(())
    }

    async fn save_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.backend.modify(|d| {
            d.insert(self.keys.access_token.clone(), access_token.to_string());
            d.insert(self.keys.refresh_token.clone(), refresh_token.to_string());
            Ok(())
        })
    }

    async fn clear(&self) -> Result<()> {
        self.backend.modify(|d| {
            doc::remove_all(d, &self.keys);
            Ok(())
        })?;
        tracing::debug!("Cleared stored credentials");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            organisation_id: Some(4),
            first_time_login: false,
        }
    }

    fn full_credentials() -> StoredCredentials {
        StoredCredentials {
            access_token: Some("A".into()),
            refresh_token: Some("B".into()),
            first_time_login: true,
            user_profile: Some(profile()),
        }
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");

        let store = FileCredentialStore::open(path.clone(), "taskdesk");
        store.save(&full_credentials()).await.unwrap();

        let reopened = FileCredentialStore::open(path, "taskdesk");
        assert_eq!(reopened.load().await.unwrap(), full_credentials());
        assert_eq!(reopened.access_token().await.unwrap().as_deref(), Some("A"));
        assert!(reopened.first_time_login().await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_uses_namespaced_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");

        let store = FileCredentialStore::open(path.clone(), "crm");
        store.set_access_token("token-1").await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["crm.access_token"], "token-1");
    }

    #[tokio::test]
    async fn test_clear_removes_all_four_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::open(temp_dir.path().join("c.json"), "taskdesk");
        store.save(&full_credentials()).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        assert!(store.access_token().await.unwrap().is_none());
        assert!(store.refresh_token().await.unwrap().is_none());
        assert!(!store.first_time_login().await.unwrap());
        assert!(store.user_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.json");
        let a = FileCredentialStore::open(path.clone(), "a");
        let b = FileCredentialStore::open(path, "b");

        a.save(&full_credentials()).await.unwrap();
        b.set_access_token("other").await.unwrap();
        b.clear().await.unwrap();

        assert_eq!(a.access_token().await.unwrap().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_save_tokens_leaves_profile_alone() {
        let store = MemoryCredentialStore::with_credentials("taskdesk", &full_credentials()).unwrap();

        store.save_tokens("A2", "B2").await.unwrap();

        let creds = store.load().await.unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("A2"));
        assert_eq!(creds.refresh_token.as_deref(), Some("B2"));
        assert_eq!(creds.user_profile, Some(profile()));
        assert!(creds.first_time_login);
    }

    #[tokio::test]
    async fn test_individual_entries() {
        let store = MemoryCredentialStore::new("taskdesk");
        assert!(store.load().await.unwrap().is_empty());

        store.set_refresh_token("R").await.unwrap();
        store.set_user_profile(&profile()).await.unwrap();
        store.set_first_time_login(true).await.unwrap();
        store.set_first_time_login(false).await.unwrap();

        assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("R"));
        assert_eq!(store.user_profile().await.unwrap(), Some(profile()));
        assert!(!store.first_time_login().await.unwrap());
        assert!(store.access_token().await.unwrap().is_none());
    }

    #[test]
    fn test_is_expired_fails_closed() {
        let store = MemoryCredentialStore::new("taskdesk");
        assert!(store.is_expired("garbage"));
    }
}
