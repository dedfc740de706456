//! Folder and file management on a single provider.

use std::sync::Arc;

use tracing::{debug, info};

use vidrelay_common::{Credential, Error, ItemKind, Listing, ProviderId, Result};
use vidrelay_providers::{HostProvider, ProviderRegistry};
use vidrelay_store::CredentialStore;

use crate::validate::check_name;

/// Root folder id on every provider.
pub const ROOT_FOLDER: &str = "0";

/// Per-provider folder and file operations for one user.
///
/// Every call resolves the provider first, so an unknown name is rejected
/// before any credential lookup or network traffic.
pub struct FolderService {
    registry: Arc<ProviderRegistry>,
    credentials: Arc<dyn CredentialStore>,
}

impl FolderService {
    pub fn new(registry: Arc<ProviderRegistry>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry,
            credentials,
        }
    }

    fn prepare(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<(ProviderId, Arc<dyn HostProvider>, Credential)> {
        let adapter = self.registry.resolve(provider)?;
        let id = adapter.id();
        let credential = self
            .credentials
            .get(user_id, id)?
            .ok_or(Error::CredentialMissing(id))?;
        Ok((id, adapter, credential))
    }

    /// List a folder; `None` lists the root.
    pub async fn list(
        &self,
        user_id: &str,
        provider: &str,
        folder_id: Option<&str>,
    ) -> Result<Listing> {
        let (id, adapter, credential) = self.prepare(user_id, provider)?;
        let folder_id = folder_id.unwrap_or(ROOT_FOLDER);
        debug!("Listing {} folder {}", id, folder_id);
        adapter.list_folder(&credential, folder_id).await
    }

    pub async fn create_folder(
        &self,
        user_id: &str,
        provider: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        check_name(name, "Folder name")?;
        let (id, adapter, credential) = self.prepare(user_id, provider)?;
        info!("Creating folder '{}' on {}", name.trim(), id);
        adapter
            .create_folder(&credential, name.trim(), parent_id)
            .await
    }

    pub async fn rename_folder(
        &self,
        user_id: &str,
        provider: &str,
        folder_id: &str,
        name: &str,
    ) -> Result<()> {
        self.rename(user_id, provider, folder_id, ItemKind::Folder, name)
            .await
    }

    pub async fn rename_file(
        &self,
        user_id: &str,
        provider: &str,
        file_id: &str,
        name: &str,
    ) -> Result<()> {
        self.rename(user_id, provider, file_id, ItemKind::File, name)
            .await
    }

    async fn rename(
        &self,
        user_id: &str,
        provider: &str,
        item_id: &str,
        kind: ItemKind,
        name: &str,
    ) -> Result<()> {
        let what = match kind {
            ItemKind::Folder => "Folder name",
            ItemKind::File => "File name",
        };
        check_name(name, what)?;
        let (id, adapter, credential) = self.prepare(user_id, provider)?;
        info!("Renaming {:?} {} on {}", kind, item_id, id);
        adapter
            .rename_item(&credential, item_id, kind, name.trim())
            .await
    }

    /// Move a file into `dest_folder_id`.
    pub async fn move_file(
        &self,
        user_id: &str,
        provider: &str,
        file_id: &str,
        dest_folder_id: &str,
    ) -> Result<()> {
        check_name(dest_folder_id, "Destination folder")?;
        let (id, adapter, credential) = self.prepare(user_id, provider)?;
        info!("Moving file {} to folder {} on {}", file_id, dest_folder_id, id);
        adapter
            .move_file(&credential, file_id, dest_folder_id)
            .await
    }

    pub async fn delete_folder(&self, user_id: &str, provider: &str, folder_id: &str) -> Result<()> {
        self.delete(user_id, provider, folder_id, ItemKind::Folder)
            .await
    }

    pub async fn delete_file(&self, user_id: &str, provider: &str, file_id: &str) -> Result<()> {
        self.delete(user_id, provider, file_id, ItemKind::File)
            .await
    }

    async fn delete(
        &self,
        user_id: &str,
        provider: &str,
        item_id: &str,
        kind: ItemKind,
    ) -> Result<()> {
        let (id, adapter, credential) = self.prepare(user_id, provider)?;
        info!("Deleting {:?} {} on {}", kind, item_id, id);
        adapter.delete_item(&credential, item_id, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidrelay_common::ListingItem;
    use vidrelay_providers::ScriptedProvider;
    use vidrelay_store::MemoryCredentialStore;

    fn service(adapter: Arc<ScriptedProvider>) -> (FolderService, Arc<MemoryCredentialStore>) {
        let mut registry = ProviderRegistry::new();
        registry.register(adapter).unwrap();
        let credentials = Arc::new(MemoryCredentialStore::new());
        (
            FolderService::new(Arc::new(registry), credentials.clone()),
            credentials,
        )
    }

    #[tokio::test]
    async fn test_list_uses_stored_credential() {
        let listing = Listing {
            folders: vec![ListingItem::folder("7", "Trips")],
            files: vec![ListingItem::file("abc", "clip.mp4")],
        };
        let adapter =
            Arc::new(ScriptedProvider::succeeding(ProviderId::DoodStream).with_listing(listing));
        let (service, credentials) = service(adapter.clone());
        credentials
            .set("u1", ProviderId::DoodStream, &Credential::new("dood-key").unwrap())
            .unwrap();

        let listed = service.list("u1", "doodstream", None).await.unwrap();
        assert_eq!(listed.total(), 2);
        assert_eq!(adapter.seen_credentials(), vec!["dood-key".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_provider_before_credential_lookup() {
        let adapter = Arc::new(ScriptedProvider::succeeding(ProviderId::VidGuard));
        let (service, _) = service(adapter.clone());

        let err = service.list("u1", "mega", None).await.unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(_)));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let adapter = Arc::new(ScriptedProvider::succeeding(ProviderId::VidGuard));
        let (service, _) = service(adapter.clone());

        let err = service.delete_file("u1", "vidguard", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "VidGuard API key not configured");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let adapter = Arc::new(ScriptedProvider::succeeding(ProviderId::BigWarp));
        let (service, credentials) = service(adapter.clone());
        credentials
            .set("u1", ProviderId::BigWarp, &Credential::new("k").unwrap())
            .unwrap();

        let err = service
            .create_folder("u1", "bigwarp", "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(adapter.calls(), 0);

        service
            .rename_folder("u1", "bigwarp", "3", "Renamed")
            .await
            .unwrap();
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_move_passes_through() {
        let adapter = Arc::new(ScriptedProvider::succeeding(ProviderId::BigWarp).without_move());
        let (service, credentials) = service(adapter);
        credentials
            .set("u1", ProviderId::BigWarp, &Credential::new("k").unwrap())
            .unwrap();

        let err = service
            .move_file("u1", "bigwarp", "f1", "2")
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
    }
}
