//! Fan-out upload orchestration.
//!
//! One upload (a file, or a remote URL) is sent to every requested provider
//! at once. Each provider call is isolated: its error, or even a panic inside
//! the adapter, becomes a failed [`UploadOutcome`] for that provider alone.
//! Outcomes keep the order of the requested targets.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use vidrelay_common::{
    BatchStatus, Credential, Error, ProviderId, Result, UploadOptions, UploadOutcome,
    UploadedFile,
};
use vidrelay_providers::{HostProvider, ProviderRegistry};
use vidrelay_store::{CredentialStore, HistoryRecord, HistoryStore};

use crate::validate::{self, UploadLimits};

/// A file submitted for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Outcomes for one file, one per requested provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub filename: String,
    pub status: BatchStatus,
    pub uploads: Vec<UploadOutcome>,
}

impl FileReport {
    /// At least one provider accepted the file.
    pub fn succeeded(&self) -> bool {
        self.uploads.iter().any(|u| u.success)
    }
}

/// Result of a multi-file upload request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// True if at least one provider succeeded for at least one file.
    pub success: bool,
    pub status: BatchStatus,
    pub results: Vec<FileReport>,
    pub message: String,
}

/// Result of a remote upload request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReport {
    pub success: bool,
    pub status: BatchStatus,
    pub results: Vec<UploadOutcome>,
    pub message: String,
}

/// Drives uploads across providers.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    credentials: Arc<dyn CredentialStore>,
    history: Arc<dyn HistoryStore>,
    limits: UploadLimits,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        credentials: Arc<dyn CredentialStore>,
        history: Arc<dyn HistoryStore>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            registry,
            credentials,
            history,
            limits,
        }
    }

    /// Upload limits applied to every file.
    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Upload each file to every target provider.
    ///
    /// Files are processed one after another; providers for one file run
    /// concurrently.
    ///
    /// # Errors
    /// - `Validation` / `UnknownProvider` when the request is malformed; no
    ///   adapter has been called in that case
    pub async fn upload_files<S: AsRef<str>>(
        &self,
        user_id: &str,
        files: Vec<UploadFile>,
        targets: &[S],
        options: &UploadOptions,
    ) -> Result<BatchReport> {
        if files.is_empty() {
            return Err(Error::Validation("No files provided".to_string()));
        }
        let targets = validate::parse_targets(targets)?;
        for file in &files {
            self.limits
                .check_file(&file.filename, file.data.len() as u64, &file.mime_type)?;
        }

        let file_count = files.len();
        let mut results = Vec::with_capacity(file_count);
        for file in files {
            info!(
                "Uploading {} ({} bytes) to {} provider(s)",
                file.filename,
                file.data.len(),
                targets.len()
            );
            let outcomes = self
                .fan_out(user_id, &targets, |adapter, credential| {
                    let data = file.data.clone();
                    let filename = file.filename.clone();
                    let options = options.clone();
                    async move { adapter.upload(&credential, data, &filename, &options).await }
                })
                .await;

            self.record_history(user_id, &file.filename, &outcomes);
            results.push(FileReport {
                filename: file.filename,
                status: BatchStatus::from_outcomes(&outcomes),
                uploads: outcomes,
            });
        }

        let all: Vec<UploadOutcome> = results
            .iter()
            .flat_map(|r| r.uploads.iter().cloned())
            .collect();
        Ok(BatchReport {
            success: results.iter().any(FileReport::succeeded),
            status: BatchStatus::from_outcomes(&all),
            message: format!(
                "Processed {} file(s) with {} provider(s)",
                file_count,
                targets.len()
            ),
            results,
        })
    }

    /// Ask every target provider to fetch `url`.
    pub async fn upload_remote<S: AsRef<str>>(
        &self,
        user_id: &str,
        url: &str,
        targets: &[S],
        options: &UploadOptions,
    ) -> Result<RemoteReport> {
        validate::check_remote_url(url)?;
        let targets = validate::parse_targets(targets)?;
        let url = url.trim();

        info!("Remote upload of {} to {} provider(s)", url, targets.len());
        let outcomes = self
            .fan_out(user_id, &targets, |adapter, credential| {
                let url = url.to_string();
                let options = options.clone();
                async move { adapter.upload_remote(&credential, &url, &options).await }
            })
            .await;

        self.record_history(user_id, url, &outcomes);
        let success = outcomes.iter().any(|o| o.success);
        Ok(RemoteReport {
            success,
            status: BatchStatus::from_outcomes(&outcomes),
            message: if success {
                "Remote upload completed".to_string()
            } else {
                "All remote uploads failed".to_string()
            },
            results: outcomes,
        })
    }

    /// Run `call` against every target concurrently and wait for all of them.
    async fn fan_out<F, Fut>(
        &self,
        user_id: &str,
        targets: &[ProviderId],
        call: F,
    ) -> Vec<UploadOutcome>
    where
        F: Fn(Arc<dyn HostProvider>, Credential) -> Fut + Sync,
        Fut: Future<Output = Result<UploadedFile>> + Send,
    {
        let call = &call;
        let attempts = targets.iter().map(|&provider| async move {
            let attempt = self.attempt(user_id, provider, call);
            match AssertUnwindSafe(attempt).catch_unwind().await {
                Ok(result) => {
                    if let Err(e) = &result {
                        warn!("{} upload failed: {}", provider.display_name(), e);
                    }
                    UploadOutcome::from_result(provider, result)
                }
                Err(_) => {
                    error!("{} adapter panicked during upload", provider.display_name());
                    UploadOutcome::failed(
                        provider,
                        format!("{} upload failed unexpectedly", provider.display_name()),
                    )
                }
            }
        });
        join_all(attempts).await
    }

    async fn attempt<F, Fut>(
        &self,
        user_id: &str,
        provider: ProviderId,
        call: &F,
    ) -> Result<UploadedFile>
    where
        F: Fn(Arc<dyn HostProvider>, Credential) -> Fut,
        Fut: Future<Output = Result<UploadedFile>>,
    {
        let adapter = self.registry.get(provider)?;
        let credential = self
            .credentials
            .get(user_id, provider)?
            .ok_or(Error::CredentialMissing(provider))?;
        call(adapter, credential).await
    }

    /// History is best effort; a failed write never fails the upload.
    fn record_history(&self, user_id: &str, filename: &str, outcomes: &[UploadOutcome]) {
        for outcome in outcomes {
            let record = HistoryRecord::from_outcome(user_id, filename, outcome);
            if let Err(e) = self.history.record(&record) {
                warn!("Failed to record upload history for {}: {}", filename, e);
            }
        }
    }
}
