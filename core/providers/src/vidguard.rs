//! VidGuard adapter.
//!
//! VidGuard's `folder/list` only returns subfolders, so a listing is two
//! calls (folders, then videos) issued together and merged. Mutations that
//! succeed answer `{status: 200, msg: "Done"}`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use vidrelay_common::{
    AccountInfo, Credential, Error, ItemKind, Listing, ListingItem, ProviderId, Result,
    UploadOptions, UploadedFile,
};

use crate::http;
use crate::listing::{self, string_field, timestamp_field, u64_field};
use crate::provider::HostProvider;

const API_BASE: &str = "https://api.vidguard.to/v1";
const PUBLIC_BASE: &str = "https://vidguard.to";

/// Success marker on mutation responses.
const DONE: &str = "Done";

/// Page size for the video half of a listing.
const VIDEO_PAGE_LIMIT: &str = "100";

/// Base URLs for the VidGuard API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VidGuardEndpoints {
    pub api_base: String,
    pub public_base: String,
}

impl Default for VidGuardEndpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            public_base: PUBLIC_BASE.to_string(),
        }
    }
}

/// VidGuard provider.
pub struct VidGuardProvider {
    http: Client,
    endpoints: VidGuardEndpoints,
}

impl VidGuardProvider {
    pub fn new(http: Client) -> Self {
        Self::with_endpoints(http, VidGuardEndpoints::default())
    }

    pub fn with_endpoints(http: Client, endpoints: VidGuardEndpoints) -> Self {
        Self { http, endpoints }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    fn public(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.public_base.trim_end_matches('/'), path)
    }

    async fn get(
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

    /// A mutation is only successful with both `status == 200` and `msg == "Done"`.
    async fn mutate(
        &self,
        credential: &Credential,
        path: &str,
        params: &[(&str, &str)],
        fallback: &str,
    ) -> Result<()> {
        let body = self.get(credential, path, params, fallback).await?;
        http::ensure_ok_with_msg(&body, DONE, fallback)
    }

    async fn list_subfolders(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<Vec<ListingItem>> {
        let body = self
            .get(
                credential,
                "folder/list",
                &[("folder", folder_id)],
                "VidGuard folder list",
            )
            .await?;
        http::ensure_ok(&body, "Failed to list folders")?;
        Ok(listing::collect_items(
            listing::array(&body, "result"),
            Self::parse_folder,
        ))
    }

    async fn list_videos(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<Vec<ListingItem>> {
        let body = self
            .get(
                credential,
                "video/list",
                &[
                    ("folder", folder_id),
                    ("limit", VIDEO_PAGE_LIMIT),
                    ("deleted", "0"),
                ],
                "VidGuard video list",
            )
            .await?;
        http::ensure_ok_with_msg(&body, DONE, "Failed to list videos")?;
        Ok(listing::collect_items(
            listing::array(&body, "result"),
            |v| self.parse_video(v),
        ))
    }

    fn parse_folder(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "ID")?;
        let mut item = ListingItem::folder(id, string_field(value, "name").unwrap_or_default());
        item.created_at = timestamp_field(value, "CreatedAt");
        Some(item)
    }

    fn parse_video(&self, value: &Value) -> Option<ListingItem> {
        let hash = string_field(value, "HashID")?;
        let mut item = ListingItem::file(
            hash.clone(),
            string_field(value, "Name").unwrap_or_default(),
        );
        item.size = u64_field(value, "Size");
        item.created_at = timestamp_field(value, "CreatedAt");
        item.url = Some(self.public(&format!("/v/{}", hash)));
        item.thumbnail_url = string_field(value, "Poster");
        item.view_count = u64_field(value, "Views");
        item.duration_seconds = u64_field(value, "Duration");
        Some(item)
    }

    fn uploaded_file(&self, result: &Value) -> Option<UploadedFile> {
        let id = string_field(result, "HashID").or_else(|| string_field(result, "id"));
        let url = string_field(result, "URL")
            .map(|path| {
                if path.starts_with("http") {
                    path
                } else {
                    self.public(&path)
                }
            })
            .or_else(|| id.as_deref().map(|h| self.public(&format!("/v/{}", h))));
        if url.is_none() && id.is_none() {
            return None;
        }
        Some(UploadedFile { url, id })
    }
}

#[async_trait]
impl HostProvider for VidGuardProvider {
    fn id(&self) -> ProviderId {
        ProviderId::VidGuard
    }

    async fn upload(
        &self,
        credential: &Credential,
        data: Bytes,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        info!("VidGuard upload started for: {} ({} bytes)", filename, data.len());

        let server = self
            .get(credential, "upload/server", &[], "VidGuard server request")
            .await?;
        let server_url = match (
            http::status_of(&server),
            server.get("result").and_then(|r| string_field(r, "url")),
        ) {
            (Some(200), Some(url)) => url,
            _ => {
                return Err(Error::UpstreamLogical(format!(
                    "Failed to get upload server URL: {}",
                    http::message_of(&server).unwrap_or("Unknown error")
                )))
            }
        };
        debug!("VidGuard uploading to: {}", server_url);

        let form = Form::new()
            .part("file", http::file_part(data, filename)?)
            .text("key", credential.expose().to_string())
            .text(
                "folder",
                options.folder_id.clone().unwrap_or_else(|| "0".to_string()),
            );

        let what = "VidGuard upload";
        let response = http::send(self.http.post(server_url).multipart(form), what).await?;
        let body = http::read_json(response, what).await?;
        http::ensure_ok(&body, "Upload failed")?;

        let file = body
            .get("result")
            .and_then(|r| self.uploaded_file(r))
            .ok_or_else(|| {
                Error::UpstreamLogical("Upload completed but no file data returned".to_string())
            })?;

        info!("VidGuard upload finished for: {}", filename);
        Ok(file)
    }

    async fn upload_remote(
        &self,
        credential: &Credential,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        let mut form = Form::new()
            .text("key", credential.expose().to_string())
            .text("url", source_url.to_string());
        if let Some(folder) = options.folder_id.clone() {
            form = form.text("folder", folder);
        }

        let what = "VidGuard remote upload";
        let response =
            http::send(self.http.post(self.url("remote/upload")).multipart(form), what).await?;
        let body = http::read_json(response, what).await?;
        http::ensure_ok(&body, "Remote upload failed")?;

        body.get("result")
            .and_then(|r| r.get(0))
            .and_then(|r| self.uploaded_file(r))
            .ok_or_else(|| {
                Error::UpstreamLogical("Remote upload accepted but no id returned".to_string())
            })
    }

    async fn list_folder(&self, credential: &Credential, folder_id: &str) -> Result<Listing> {
        let (folders, files) = tokio::join!(
            self.list_subfolders(credential, folder_id),
            self.list_videos(credential, folder_id)
        );
        Ok(listing::merge_split(
            ProviderId::VidGuard.display_name(),
            folders,
            files,
        ))
    }

    async fn create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        let body = self
            .get(
                credential,
                "folder/new",
                &[("name", name), ("folder", parent_id.unwrap_or("0"))],
                "VidGuard create folder",
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
        match kind {
            ItemKind::Folder => {
                self.mutate(
                    credential,
                    "folder/rename",
                    &[("id", id), ("name", new_name)],
                    "Rename failed",
                )
                .await
            }
            ItemKind::File => Err(Error::Unsupported(
                "File rename not supported for VidGuard".to_string(),
            )),
        }
    }

    async fn move_file(&self, credential: &Credential, id: &str, dest: &str) -> Result<()> {
        self.mutate(
            credential,
            "video/move",
            &[("id", id), ("folder", dest)],
            "Move failed",
        )
        .await
    }

    async fn delete_item(&self, credential: &Credential, id: &str, kind: ItemKind) -> Result<()> {
        let path = match kind {
            ItemKind::Folder => "folder/delete",
            ItemKind::File => "video/delete",
        };
        let body = self
            .get(credential, path, &[("id", id)], "VidGuard delete")
            .await?;
        http::ensure_ok(&body, "Delete failed")
    }

    async fn account_info(&self, credential: &Credential) -> Result<AccountInfo> {
        let body = self
            .get(credential, "user/info", &[], "VidGuard account info")
            .await?;
        http::ensure_ok(&body, "Failed to get account info")?;
        let result = body.get("result").unwrap_or(&Value::Null);

        let email = string_field(result, "Email");
        Ok(AccountInfo {
            username: email.clone(),
            email,
            balance: listing::f64_field(result, "Balance"),
            currency: string_field(result, "Currency"),
            role: string_field(result, "Role"),
            created_at: timestamp_field(result, "CreatedAt"),
            ..AccountInfo::default()
        })
    }
}
