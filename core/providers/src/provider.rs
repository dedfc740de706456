//! Hosting provider trait definition.

use async_trait::async_trait;
use bytes::Bytes;

use vidrelay_common::{
    AccountInfo, Credential, ItemKind, Listing, ProviderId, Result, UploadOptions, UploadedFile,
};

/// Uniform interface over one file-hosting provider's HTTP API.
///
/// Every operation takes the caller's credential; adapters hold no per-user
/// state and are shared across requests. Each call is independent and may
/// fail on its own without affecting any other call.
///
/// Errors follow one taxonomy across providers:
/// - `MalformedCredential` when the secret has the wrong shape (checked
///   before any network call)
/// - `UpstreamTransport` for non-2xx responses, timeouts, and bodies that
///   are not the JSON we expected
/// - `UpstreamLogical` when the provider's own success marker is false
/// - `Unsupported` when the provider has no equivalent operation
#[async_trait]
pub trait HostProvider: Send + Sync {
    /// Which provider this adapter speaks to.
    fn id(&self) -> ProviderId;

    /// Upload raw bytes as a new file.
    ///
    /// # Postconditions
    /// - Returns the canonical playback/download URL and/or the provider's
    ///   file id
    async fn upload(
        &self,
        credential: &Credential,
        data: Bytes,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile>;

    /// Ask the provider to fetch a file from a remote URL.
    async fn upload_remote(
        &self,
        credential: &Credential,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile>;

    /// List the folders and files directly inside `folder_id`.
    ///
    /// `"0"` is the root on every provider.
    async fn list_folder(&self, credential: &Credential, folder_id: &str) -> Result<Listing>;

    /// Create a folder under `parent_id`, or under the root when `None`.
    async fn create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<()>;

    /// Rename a folder or a file.
    async fn rename_item(
        &self,
        credential: &Credential,
        id: &str,
        kind: ItemKind,
        new_name: &str,
    ) -> Result<()>;

    /// Move a file into another folder.
    async fn move_file(
        &self,
        credential: &Credential,
        id: &str,
        dest_folder_id: &str,
    ) -> Result<()>;

    /// Delete a folder or a file.
    async fn delete_item(&self, credential: &Credential, id: &str, kind: ItemKind) -> Result<()>;

    /// Fetch and normalize account details.
    async fn account_info(&self, credential: &Credential) -> Result<AccountInfo>;
}
