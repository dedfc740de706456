//! BigWarp adapter.
//!
//! BigWarp's upload-server endpoint is frequently overloaded, so it is
//! fetched under a bounded retry policy. Only transient failures are retried;
//! a well-formed refusal from the API surfaces immediately.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::Form;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use vidrelay_common::{
    AccountInfo, Credential, Error, ItemKind, Listing, ListingItem, ProviderId, Result,
    UploadOptions, UploadedFile,
};

use crate::http;
use crate::listing::{self, array, string_field, timestamp_field, u64_field};
use crate::provider::HostProvider;
use crate::retry::{RetryConfig, RetryExecutor};

const API_BASE: &str = "https://bigwarp.io/api";
const PUBLIC_BASE: &str = "https://bigwarp.io";

/// The upload-server endpoint rejects non-browser agents.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const OVERLOADED: &str =
    "BigWarp servers are temporarily overloaded. Please try again in a few minutes.";

/// Base URLs for the BigWarp API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigWarpEndpoints {
    pub api_base: String,
    pub public_base: String,
}

impl Default for BigWarpEndpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            public_base: PUBLIC_BASE.to_string(),
        }
    }
}

/// Retry policy for the upload-server request: 3 attempts, waiting 2s then 4s.
pub fn default_server_retry() -> RetryConfig {
    RetryConfig::linear(3, Duration::from_secs(2))
}

/// BigWarp provider.
pub struct BigWarpProvider {
    http: Client,
    endpoints: BigWarpEndpoints,
    retry: RetryExecutor,
}

impl BigWarpProvider {
    pub fn new(http: Client) -> Self {
        Self::with_endpoints(http, BigWarpEndpoints::default())
    }

    pub fn with_endpoints(http: Client, endpoints: BigWarpEndpoints) -> Self {
        Self {
            http,
            endpoints,
            retry: RetryExecutor::new(default_server_retry()),
        }
    }

    /// Replace the upload-server retry policy.
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    fn share_url(&self, filecode: &str) -> String {
        format!(
            "{}/{}.html",
            self.endpoints.public_base.trim_end_matches('/'),
            filecode
        )
    }

    async fn call(
        &self,
        credential: &Credential,
        path: &str,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<Value> {
        let request = self
            .http
            .get(self.url(path))
            .query(&[("key", credential.expose())])
            .query(params);
        let response = http::send(request, what).await?;
        http::read_json(response, what).await
    }

    /// One attempt at fetching the upload server URL.
    async fn fetch_upload_server(&self, credential: &Credential) -> Result<String> {
        let what = "BigWarp server request";
        let request = self
            .http
            .get(self.url("upload/server"))
            .query(&[("key", credential.expose())])
            .header(header::USER_AGENT, BROWSER_USER_AGENT);

        let response = http::send(request, what).await?;
        let body = http::read_json(response, what).await?;
        debug!("BigWarp server response status: {:?}", http::status_of(&body));

        match (http::status_of(&body), string_field(&body, "result")) {
            (Some(200), Some(url)) => Ok(url),
            _ => Err(Error::UpstreamLogical(format!(
                "BigWarp upload servers unavailable: {}",
                http::message_of(&body).unwrap_or("Please try again later")
            ))),
        }
    }

    async fn upload_server(&self, credential: &Credential) -> Result<String> {
        self.retry
            .execute(|| self.fetch_upload_server(credential))
            .await
            .map_err(|e| match e {
                Error::UpstreamTransport(detail) => {
                    warn!("BigWarp upload server retries exhausted: {}", detail);
                    Error::UpstreamTransport(OVERLOADED.to_string())
                }
                other => other,
            })
    }

    fn parse_folder(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "fld_id")?;
        Some(ListingItem::folder(
            id,
            string_field(value, "name").unwrap_or_default(),
        ))
    }

    fn parse_file(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "file_code")?;
        let mut item = ListingItem::file(id, string_field(value, "title").unwrap_or_default());
        item.size = u64_field(value, "size");
        item.created_at = timestamp_field(value, "uploaded");
        item.url = string_field(value, "link");
        item.thumbnail_url = string_field(value, "thumbnail");
        item.view_count = u64_field(value, "views");
        item.duration_seconds = u64_field(value, "length");
        Some(item)
    }
}

#[async_trait]
impl HostProvider for BigWarpProvider {
    fn id(&self) -> ProviderId {
        ProviderId::BigWarp
    }

    async fn upload(
        &self,
        credential: &Credential,
        data: Bytes,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        info!("BigWarp upload started for: {} ({} bytes)", filename, data.len());

        let server = self.upload_server(credential).await?;

        let mut form = Form::new()
            .part("file", http::file_part(data, filename)?)
            .text("key", credential.expose().to_string());
        if let Some(title) = options.description.clone() {
            form = form.text("file_title", title);
        }
        if let Some(folder) = options.folder_id.clone() {
            form = form.text("fld_id", folder);
        }
        let form = form.text("html_redirect", "0");

        let what = "BigWarp upload";
        let request = self
            .http
            .post(server)
            .header(header::ACCEPT, "application/json")
            .multipart(form);
        let response = http::send(request, what).await?;
        let status = response.status();

        if !status.is_success() {
            let text = http::read_text(response, what).await.unwrap_or_default();
            warn!("BigWarp upload failed: {} {}", status, http::excerpt(&text));
            if status == StatusCode::INTERNAL_SERVER_ERROR && text.contains("<html") {
                return Err(Error::UpstreamTransport(
                    "Service Temporarily Unavailable - Server overloaded, please try again later"
                        .to_string(),
                ));
            }
            return Err(Error::UpstreamTransport(format!(
                "Upload failed: {}",
                status
            )));
        }

        let body = http::read_json(response, what).await?;
        http::ensure_ok(&body, "Upload processing failed")?;

        let filecode = body
            .get("files")
            .and_then(|f| f.get(0))
            .filter(|first| first.get("status").and_then(Value::as_str) == Some("OK"))
            .and_then(|first| string_field(first, "filecode"))
            .ok_or_else(|| {
                Error::UpstreamLogical("Upload completed but file processing failed".to_string())
            })?;

        info!("BigWarp upload finished for: {}", filename);
        Ok(UploadedFile {
            url: Some(self.share_url(&filecode)),
            id: Some(filecode),
        })
    }

    async fn upload_remote(
        &self,
        credential: &Credential,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        let mut params = vec![("url", source_url)];
        if let Some(folder) = options.folder_id.as_deref() {
            params.push(("fld_id", folder));
        }
        let body = self
            .call(credential, "upload/url", &params, "BigWarp remote upload")
            .await?;
        http::ensure_ok(&body, "Remote upload failed")?;

        let filecode = body
            .get("result")
            .and_then(|r| string_field(r, "filecode"))
            .ok_or_else(|| {
                Error::UpstreamLogical("Remote upload accepted but no file code returned".to_string())
            })?;
        Ok(UploadedFile {
            url: Some(self.share_url(&filecode)),
            id: Some(filecode),
        })
    }

    async fn list_folder(&self, credential: &Credential, folder_id: &str) -> Result<Listing> {
        let what = "BigWarp folder list";
        let request = self
            .http
            .get(self.url("folder/list"))
            .query(&[
                ("key", credential.expose()),
                ("fld_id", folder_id),
                ("files", "1"),
            ]);
        let response = http::send(request, what).await?;
        let body = http::read_json_sniffed(response, what).await?;
        http::ensure_ok(&body, "Failed to list folder")?;

        let result = body.get("result").unwrap_or(&Value::Null);
        Ok(Listing {
            folders: listing::collect_items(array(result, "folders"), Self::parse_folder),
            files: listing::collect_items(array(result, "files"), Self::parse_file),
        })
    }

    async fn create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        let body = self
            .call(
                credential,
                "folder/create",
                &[("name", name), ("parent_id", parent_id.unwrap_or("0"))],
                "BigWarp create folder",
            )
            .await?;
        http::ensure_ok(&body, "Failed to create folder")
    }

    async fn rename_item(
        &self,
        credential: &Credential,
        id: &str,
        kind: ItemKind,
        new_name: &str,
    ) -> Result<()> {
        if kind == ItemKind::File {
            return Err(Error::Unsupported(
                "File rename not supported for BigWarp".to_string(),
            ));
        }
        let body = self
            .call(
                credential,
                "folder/edit",
                &[("fld_id", id), ("name", new_name)],
                "BigWarp rename",
            )
            .await?;
        http::ensure_ok_with_msg(&body, "OK", "Rename failed")
    }

    async fn move_file(&self, _credential: &Credential, _id: &str, _dest: &str) -> Result<()> {
        Err(Error::Unsupported(
            "File move not supported for BigWarp".to_string(),
        ))
    }

    async fn delete_item(&self, credential: &Credential, id: &str, kind: ItemKind) -> Result<()> {
        let (path, param) = match kind {
            ItemKind::Folder => ("folder/delete", ("fld_id", id)),
            ItemKind::File => ("file/delete", ("file_code", id)),
        };
        let body = self
            .call(credential, path, &[param], "BigWarp delete")
            .await?;
        http::ensure_ok(&body, "Delete failed")
    }

    async fn account_info(&self, credential: &Credential) -> Result<AccountInfo> {
        let body = self
            .call(credential, "account/info", &[], "BigWarp account info")
            .await?;
        http::ensure_ok(&body, "Failed to get account info")?;
        let result = body.get("result").unwrap_or(&Value::Null);

        let used = u64_field(result, "storage_used");
        let left = u64_field(result, "storage_left");
        let premium = u64_field(result, "premium") == Some(1);

        Ok(AccountInfo {
            username: string_field(result, "login"),
            email: string_field(result, "email"),
            storage_used: used,
            storage_total: used.zip(left).map(|(u, l)| u.saturating_add(l)),
            balance: listing::f64_field(result, "balance"),
            currency: Some("$".to_string()),
            role: Some(if premium { "premium" } else { "free" }.to_string()),
            created_at: None,
            file_count: u64_field(result, "files_total"),
            premium_expires_at: string_field(result, "premium_expire"),
        })
    }
}
