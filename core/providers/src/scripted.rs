//! Scripted in-process provider for testing.
//!
//! Answers every call from a fixed script instead of talking to a remote
//! API, and counts the calls it receives. Lets the orchestrator and server
//! be exercised without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use vidrelay_common::{
    AccountInfo, Credential, Error, ItemKind, Listing, ProviderId, Result, UploadOptions,
    UploadedFile,
};

use crate::provider::HostProvider;

#[derive(Debug, Clone)]
enum Script {
    Succeed,
    Fail(String),
    Panic,
}

/// Provider whose behavior is fixed at construction.
pub struct ScriptedProvider {
    id: ProviderId,
    script: Script,
    delay: Option<Duration>,
    listing: Listing,
    account: AccountInfo,
    supports_move: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn with_script(id: ProviderId, script: Script) -> Self {
        Self {
            id,
            script,
            delay: None,
            listing: Listing::default(),
            account: AccountInfo::default(),
            supports_move: true,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds. Uploads return `https://<id>.test/<filename>`.
    pub fn succeeding(id: ProviderId) -> Self {
        Self::with_script(id, Script::Succeed)
    }

    /// Every call fails with an `UpstreamLogical` carrying `message`.
    pub fn failing(id: ProviderId, message: impl Into<String>) -> Self {
        Self::with_script(id, Script::Fail(message.into()))
    }

    /// Every call panics.
    pub fn panicking(id: ProviderId) -> Self {
        Self::with_script(id, Script::Panic)
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Listing returned by `list_folder`.
    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = listing;
        self
    }

    /// Account returned by `account_info`.
    pub fn with_account(mut self, account: AccountInfo) -> Self {
        self.account = account;
        self
    }

    /// Report file move as unsupported.
    pub fn without_move(mut self) -> Self {
        self.supports_move = false;
        self
    }

    /// Number of trait calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Secrets this provider was called with, in call order.
    pub fn seen_credentials(&self) -> Vec<String> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    async fn enter(&self, credential: &Credential) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(credential.expose().to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Succeed => Ok(()),
            Script::Fail(message) => Err(Error::UpstreamLogical(message.clone())),
            Script::Panic => panic!("scripted {} provider panicked", self.id),
        }
    }

    fn file(&self, name: &str) -> UploadedFile {
        UploadedFile {
            url: Some(format!("https://{}.test/{}", self.id, name)),
            id: Some(format!("{}-{}", self.id, name)),
        }
    }
}

#[async_trait]
impl HostProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn upload(
        &self,
        credential: &Credential,
        _data: Bytes,
        filename: &str,
        _options: &UploadOptions,
    ) -> Result<UploadedFile> {
        self.enter(credential).await?;
        Ok(self.file(filename))
    }

    async fn upload_remote(
        &self,
        credential: &Credential,
        source_url: &str,
        _options: &UploadOptions,
    ) -> Result<UploadedFile> {
        self.enter(credential).await?;
        let name = source_url.rsplit('/').next().unwrap_or(source_url);
        Ok(self.file(name))
    }

    async fn list_folder(&self, credential: &Credential, _folder_id: &str) -> Result<Listing> {
        self.enter(credential).await?;
        Ok(self.listing.clone())
    }

    async fn create_folder(
        &self,
        credential: &Credential,
        _name: &str,
        _parent_id: Option<&str>,
    ) -> Result<()> {
        self.enter(credential).await
    }

    async fn rename_item(
        &self,
        credential: &Credential,
        _id: &str,
        _kind: ItemKind,
        _new_name: &str,
    ) -> Result<()> {
        self.enter(credential).await
    }

    async fn move_file(&self, credential: &Credential, _id: &str, _dest: &str) -> Result<()> {
        if !self.supports_move {
            return Err(Error::Unsupported(format!(
                "File move not supported for {}",
                self.id.display_name()
            )));
        }
        self.enter(credential).await
    }

    async fn delete_item(&self, credential: &Credential, _id: &str, _kind: ItemKind) -> Result<()> {
        self.enter(credential).await
    }

    async fn account_info(&self, credential: &Credential) -> Result<AccountInfo> {
        self.enter(credential).await?;
        Ok(self.account.clone())
    }
}
