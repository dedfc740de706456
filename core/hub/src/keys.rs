//! Credential management for users and admins.

use std::sync::Arc;

use tracing::{debug, info};

use vidrelay_common::{Credential, Error, ProviderId, Result};
use vidrelay_store::{CredentialRecord, CredentialStore, KeyStatus};

/// Thin policy layer over a [`CredentialStore`].
pub struct KeyService {
    store: Arc<dyn CredentialStore>,
}

impl KeyService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Which providers the user has configured.
    pub fn status(&self, user_id: &str) -> Result<KeyStatus> {
        self.store.key_status(user_id)
    }

    /// The closed provider set.
    pub fn allowed(&self) -> Vec<ProviderId> {
        ProviderId::ALL.to_vec()
    }

    /// Store a secret. The value is trimmed; an empty value is rejected.
    pub fn set(&self, user_id: &str, provider: &str, secret: &str) -> Result<ProviderId> {
        let provider: ProviderId = provider.trim().parse()?;
        let credential = Credential::new(secret)?;
        if provider.uses_composite_credential() {
            // Composite secrets must split into login and key.
            credential.split_composite()?;
        }
        self.store.set(user_id, provider, &credential)?;
        info!("Stored {} credential for user {}", provider, user_id);
        Ok(provider)
    }

    /// Store a StreamTape login and key as one composite secret.
    pub fn set_streamtape(&self, user_id: &str, login: &str, key: &str) -> Result<ProviderId> {
        let credential = Credential::composite(login, key)?;
        self.store
            .set(user_id, ProviderId::StreamTape, &credential)?;
        info!("Stored streamtape credential for user {}", user_id);
        Ok(ProviderId::StreamTape)
    }

    /// Remove the user's secret for a provider. Removing nothing is not an error.
    pub fn delete(&self, user_id: &str, provider: &str) -> Result<ProviderId> {
        let provider: ProviderId = provider.trim().parse()?;
        if self.store.delete(user_id, provider)? {
            info!("Deleted {} credential for user {}", provider, user_id);
        } else {
            debug!("No {} credential to delete for user {}", provider, user_id);
        }
        Ok(provider)
    }

    /// Every stored credential's metadata (admin).
    pub fn list_all(&self) -> Result<Vec<CredentialRecord>> {
        self.store.list_all()
    }

    /// Remove any credential by record id (admin).
    pub fn delete_by_id(&self, id: &str) -> Result<CredentialRecord> {
        let record = self
            .store
            .delete_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("API key {}", id)))?;
        info!(
            "Admin deleted {} credential {} of user {}",
            record.provider, record.id, record.user_id
        );
        Ok(record)
    }
}
