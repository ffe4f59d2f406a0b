//! High-level API for the persisted session.

use crate::{DurableStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_role() -> String {
    "user".to_string()
}

/// User identity as issued by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID
    pub id: i64,
    /// Login name
    pub username: String,
    /// Email address, when the server supplied one
    #[serde(default)]
    pub email: Option<String>,
    /// Role name; the platform only distinguishes "user" and "admin"
    #[serde(default = "default_role")]
    pub role: String,
}

impl UserRecord {
    /// Whether this is an administrator account.
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// High-level API over raw storage for the persisted session.
///
/// The persisted token and user record are a pair: `store_session`
/// writes both or neither, and `clear` removes both. Readers therefore
/// never observe a half-written session across restarts (a crash
/// between the two writes is the one accepted gap).
#[derive(Clone)]
pub struct SessionVault {
    storage: Arc<dyn DurableStorage>,
}

impl SessionVault {
    /// Create a new vault over the given storage backend.
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Retrieve the persisted bearer token.
    pub fn token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::TOKEN)
    }

    /// Retrieve and parse the persisted user record.
    pub fn user_record(&self) -> StorageResult<Option<UserRecord>> {
        match self.storage.get(StorageKeys::USER)? {
            Some(json) => {
                let user: UserRecord = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Check if a token is persisted.
    pub fn has_token(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::TOKEN)
    }

    /// Persist the complete session (token + user record).
    ///
    /// If the user write fails the token write is rolled back, so the
    /// store never holds exactly one of the pair.
    pub fn store_session(&self, token: &str, user: &UserRecord) -> StorageResult<()> {
        let json =
            serde_json::to_string(user).map_err(|e| StorageError::Encoding(e.to_string()))?;

        self.storage.set(StorageKeys::TOKEN, token)?;
        if let Err(e) = self.storage.set(StorageKeys::USER, &json) {
            tracing::warn!(error = %e, "User record write failed, rolling back token");
            let _ = self.storage.remove(StorageKeys::TOKEN);
            return Err(e);
        }
        Ok(())
    }

    /// Clear the persisted session. Both keys are removed best-effort.
    pub fn clear(&self) -> StorageResult<()> {
        let _ = self.storage.remove(StorageKeys::TOKEN);
        let _ = self.storage.remove(StorageKeys::USER);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn sample_user() -> UserRecord {
        UserRecord {
            id: 7,
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn test_store_and_read_session() {
        let vault = SessionVault::new(Arc::new(MemoryStorage::new()));

        assert!(!vault.has_token().unwrap());

        vault.store_session("t1", &sample_user()).unwrap();
        assert_eq!(vault.token().unwrap(), Some("t1".to_string()));
        assert_eq!(vault.user_record().unwrap(), Some(sample_user()));
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let vault = SessionVault::new(storage.clone());

        vault.store_session("t1", &sample_user()).unwrap();
        vault.clear().unwrap();

        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert!(!storage.has(StorageKeys::USER).unwrap());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let vault = SessionVault::new(Arc::new(MemoryStorage::new()));
        vault.clear().unwrap();
        vault.clear().unwrap();
        assert!(!vault.has_token().unwrap());
    }

    #[test]
    fn test_unparsable_user_record_is_encoding_error() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(StorageKeys::USER, "not json").unwrap();

        let vault = SessionVault::new(storage);
        assert!(matches!(
            vault.user_record(),
            Err(StorageError::Encoding(_))
        ));
    }

    #[test]
    fn test_user_record_role_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(StorageKeys::USER, r#"{"id":3,"username":"bob"}"#)
            .unwrap();

        let vault = SessionVault::new(storage);
        let user = vault.user_record().unwrap().unwrap();
        assert_eq!(user.role, "user");
        assert_eq!(user.email, None);
        assert!(!user.is_admin());
    }

    /// Storage that rejects writes to a chosen key.
    struct FailingStorage {
        inner: MemoryStorage,
        fail_key: String,
    }

    impl DurableStorage for FailingStorage {
        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if key == self.fail_key {
                return Err(StorageError::Encoding("simulated write failure".into()));
            }
            self.inner.set(key, value)
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn remove(&self, key: &str) -> StorageResult<bool> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_partial_write_rolls_back_token() {
        let storage = Arc::new(FailingStorage {
            inner: MemoryStorage::new(),
            fail_key: StorageKeys::USER.to_string(),
        });
        let vault = SessionVault::new(storage.clone());

        assert!(vault.store_session("t1", &sample_user()).is_err());

        // Neither key may remain
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert!(!storage.has(StorageKeys::USER).unwrap());
    }
}
