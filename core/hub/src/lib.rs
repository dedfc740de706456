//! Application layer for vidrelay.
//!
//! Ties the provider registry to the credential and history stores and
//! exposes the operations the server and CLI call:
//!
//! - Fan-out uploads (files and remote URLs) with per-provider isolation
//! - Folder and file management on one provider at a time
//! - Credential management and key status
//! - Account aggregation across configured providers
//! - Upload history

pub mod accounts;
pub mod config;
pub mod folders;
pub mod keys;
pub mod orchestrator;
pub mod validate;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use vidrelay_common::{ProviderId, Result};
use vidrelay_providers::{create_default_registry, ProviderRegistry};
use vidrelay_store::{
    CredentialStore, HistoryRecord, HistoryStore, SqliteStore, ADMIN_HISTORY_LIMIT,
};

pub use accounts::AccountEntry;
pub use config::AppConfig;
pub use folders::{FolderService, ROOT_FOLDER};
pub use keys::KeyService;
pub use orchestrator::{BatchReport, FileReport, Orchestrator, RemoteReport, UploadFile};
pub use validate::UploadLimits;

/// How many of a user's own history records are returned.
pub const USER_HISTORY_LIMIT: usize = 50;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    registry: Arc<ProviderRegistry>,
    credentials: Arc<dyn CredentialStore>,
    history: Arc<dyn HistoryStore>,
    orchestrator: Arc<Orchestrator>,
    folders: Arc<FolderService>,
    keys: Arc<KeyService>,
}

impl Hub {
    pub fn new(
        registry: ProviderRegistry,
        credentials: Arc<dyn CredentialStore>,
        history: Arc<dyn HistoryStore>,
        limits: UploadLimits,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            orchestrator: Arc::new(Orchestrator::new(
                registry.clone(),
                credentials.clone(),
                history.clone(),
                limits,
            )),
            folders: Arc::new(FolderService::new(registry.clone(), credentials.clone())),
            keys: Arc::new(KeyService::new(credentials.clone())),
            registry,
            credentials,
            history,
        }
    }

    /// Build the production hub: real adapters over one SQLite database.
    ///
    /// # Errors
    /// - The database cannot be opened or created
    /// - The HTTP client cannot be built
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteStore::open(&config.database_path)?);
        let registry = create_default_registry(&config.providers)?;
        info!(
            "Hub ready with {} provider(s)",
            registry.providers().len()
        );
        Ok(Self::new(
            registry,
            store.clone(),
            store,
            config.upload.clone(),
        ))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn folders(&self) -> &FolderService {
        &self.folders
    }

    pub fn keys(&self) -> &KeyService {
        &self.keys
    }

    /// Account details for every provider the user has configured.
    pub async fn accounts(&self, user_id: &str) -> Result<BTreeMap<ProviderId, AccountEntry>> {
        accounts::aggregate_accounts(&self.registry, &self.credentials, user_id).await
    }

    /// The user's most recent uploads, newest first.
    pub fn history(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        self.history.list_for_user(user_id, USER_HISTORY_LIMIT)
    }

    /// Most recent uploads across all users (admin).
    pub fn all_history(&self) -> Result<Vec<HistoryRecord>> {
        self.history.list_recent(ADMIN_HISTORY_LIMIT)
    }
}
