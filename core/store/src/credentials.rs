//! Per-user provider credential storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vidrelay_common::{Credential, Error, ProviderId, Result};

/// Which providers a user has configured, for every supported provider.
pub type KeyStatus = BTreeMap<ProviderId, bool>;

/// Credential metadata. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub id: String,
    pub user_id: String,
    pub provider: ProviderId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for provider secrets keyed by (user, provider).
///
/// At most one secret exists per pair; `set` overwrites.
pub trait CredentialStore: Send + Sync {
    /// Secret for the pair, if configured.
    fn get(&self, user_id: &str, provider: ProviderId) -> Result<Option<Credential>>;

    /// Store or replace the secret for the pair.
    fn set(&self, user_id: &str, provider: ProviderId, credential: &Credential) -> Result<()>;

    /// Remove the secret for the pair. Returns whether one existed.
    fn delete(&self, user_id: &str, provider: ProviderId) -> Result<bool>;

    /// Providers the user has a secret for.
    fn configured(&self, user_id: &str) -> Result<Vec<ProviderId>>;

    /// Every stored credential across all users, newest first.
    fn list_all(&self) -> Result<Vec<CredentialRecord>>;

    /// Remove a credential by record id, returning its metadata.
    fn delete_by_id(&self, id: &str) -> Result<Option<CredentialRecord>>;

    /// One boolean per supported provider.
    fn key_status(&self, user_id: &str) -> Result<KeyStatus> {
        let configured = self.configured(user_id)?;
        Ok(ProviderId::ALL
            .into_iter()
            .map(|p| (p, configured.contains(&p)))
            .collect())
    }
}

struct Entry {
    record: CredentialRecord,
    secret: Credential,
}

/// In-memory credential store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<(String, ProviderId), Entry>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::Storage("credential store lock poisoned".to_string())
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, user_id: &str, provider: ProviderId) -> Result<Option<Credential>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .get(&(user_id.to_string(), provider))
            .map(|e| e.secret.clone()))
    }

    fn set(&self, user_id: &str, provider: ProviderId, credential: &Credential) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let now = Utc::now();
        entries
            .entry((user_id.to_string(), provider))
            .and_modify(|e| {
                e.secret = credential.clone();
                e.record.updated_at = now;
            })
            .or_insert_with(|| Entry {
                record: CredentialRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    provider,
                    created_at: now,
                    updated_at: now,
                },
                secret: credential.clone(),
            });
        Ok(())
    }

    fn delete(&self, user_id: &str, provider: ProviderId) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.remove(&(user_id.to_string(), provider)).is_some())
    }

    fn configured(&self, user_id: &str) -> Result<Vec<ProviderId>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut providers: Vec<_> = entries
            .keys()
            .filter(|(user, _)| user == user_id)
            .map(|(_, p)| *p)
            .collect();
        providers.sort();
        Ok(providers)
    }

    fn list_all(&self) -> Result<Vec<CredentialRecord>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut records: Vec<_> = entries.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn delete_by_id(&self, id: &str) -> Result<Option<CredentialRecord>> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let key = entries
            .iter()
            .find(|(_, e)| e.record.id == id)
            .map(|(k, _)| k.clone());
        Ok(key
            .and_then(|k| entries.remove(&k))
            .map(|e| e.record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(s: &str) -> Credential {
        Credential::new(s).unwrap()
    }

    #[test]
    fn test_set_get_delete() {
        let store = MemoryCredentialStore::new();
        assert!(store.get("u1", ProviderId::VidGuard).unwrap().is_none());

        store.set("u1", ProviderId::VidGuard, &cred("k1")).unwrap();
        store.set("u1", ProviderId::VidGuard, &cred("k2")).unwrap();
        assert_eq!(
            store.get("u1", ProviderId::VidGuard).unwrap().unwrap().expose(),
            "k2"
        );
        assert_eq!(store.list_all().unwrap().len(), 1);

        assert!(store.delete("u1", ProviderId::VidGuard).unwrap());
        assert!(!store.delete("u1", ProviderId::VidGuard).unwrap());
        assert!(store.get("u1", ProviderId::VidGuard).unwrap().is_none());
    }

    #[test]
    fn test_credentials_are_per_user() {
        let store = MemoryCredentialStore::new();
        store.set("u1", ProviderId::BigWarp, &cred("a")).unwrap();
        assert!(store.get("u2", ProviderId::BigWarp).unwrap().is_none());
        assert!(store.configured("u2").unwrap().is_empty());
    }

    #[test]
    fn test_key_status_covers_every_provider() {
        let store = MemoryCredentialStore::new();
        store.set("u1", ProviderId::StreamTape, &cred("l:k")).unwrap();

        let status = store.key_status("u1").unwrap();
        assert_eq!(status.len(), ProviderId::ALL.len());
        assert!(status[&ProviderId::StreamTape]);
        assert!(!status[&ProviderId::DoodStream]);
        assert_eq!(status, store.key_status("u1").unwrap());
    }

    #[test]
    fn test_delete_by_id() {
        let store = MemoryCredentialStore::new();
        store.set("u1", ProviderId::DoodStream, &cred("a")).unwrap();
        let id = store.list_all().unwrap()[0].id.clone();

        let removed = store.delete_by_id(&id).unwrap().unwrap();
        assert_eq!(removed.provider, ProviderId::DoodStream);
        assert!(store.delete_by_id(&id).unwrap().is_none());
        assert!(store.get("u1", ProviderId::DoodStream).unwrap().is_none());
    }
}
