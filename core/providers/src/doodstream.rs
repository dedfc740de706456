//! DoodStream adapter.
//!
//! Single API token passed as `key`. Uploads are two-step: fetch an upload
//! server URL, then POST multipart to `<server>?<key>`. Every response uses
//! the `{status: 200, msg, result}` envelope.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
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
use crate::listing::{self, array, string_field, timestamp_field, u64_field};
use crate::provider::HostProvider;

/// DoodStream API base URL.
const API_BASE: &str = "https://doodapi.com/api";
/// Public site used to build share links.
const PUBLIC_BASE: &str = "https://dood.to";

/// Base URLs for the DoodStream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoodStreamEndpoints {
    pub api_base: String,
    pub public_base: String,
}

impl Default for DoodStreamEndpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            public_base: PUBLIC_BASE.to_string(),
        }
    }
}

/// DoodStream provider.
pub struct DoodStreamProvider {
    http: Client,
    endpoints: DoodStreamEndpoints,
}

impl DoodStreamProvider {
    /// Create an adapter talking to the production API.
    pub fn new(http: Client) -> Self {
        Self::with_endpoints(http, DoodStreamEndpoints::default())
    }

    /// Create an adapter against custom base URLs.
    pub fn with_endpoints(http: Client, endpoints: DoodStreamEndpoints) -> Self {
        Self { http, endpoints }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    /// GET an API path with the key attached and check the envelope.
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
        let body = http::read_json(response, what).await?;
        http::ensure_ok(&body, &format!("{} failed", what))?;
        Ok(body)
    }

    async fn upload_server(&self, credential: &Credential) -> Result<String> {
        let what = "DoodStream server request";
        let request = self
            .http
            .get(self.url("upload/server"))
            .query(&[("key", credential.expose())]);

        let response = http::send(request, what).await?;
        let body = http::read_json(response, what).await?;
        debug!("DoodStream server response status: {:?}", http::status_of(&body));

        if http::status_of(&body) != Some(200) {
            return Err(Error::UpstreamLogical(format!(
                "Failed to get upload server URL: {}",
                http::message_of(&body).unwrap_or("Unknown error")
            )));
        }

        body.get("result")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::UpstreamLogical(
                    "Failed to get upload server URL: response has no server URL".to_string(),
                )
            })
    }

    fn share_url(&self, filecode: &str) -> String {
        format!(
            "{}/d/{}",
            self.endpoints.public_base.trim_end_matches('/'),
            filecode
        )
    }

    fn parse_folder(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "fld_id")?;
        let name = string_field(value, "name").unwrap_or_default();
        Some(ListingItem::folder(id, name))
    }

    fn parse_file(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "file_code")?;
        let mut item = ListingItem::file(id, string_field(value, "title").unwrap_or_default());
        item.size = u64_field(value, "size");
        item.created_at = timestamp_field(value, "uploaded");
        item.url = string_field(value, "download_url");
        item.thumbnail_url = string_field(value, "single_img");
        item.view_count = u64_field(value, "views");
        item.duration_seconds = u64_field(value, "length").or_else(|| u64_field(value, "duration"));
        Some(item)
    }
}

#[async_trait]
impl HostProvider for DoodStreamProvider {
    fn id(&self) -> ProviderId {
        ProviderId::DoodStream
    }

    async fn upload(
        &self,
        credential: &Credential,
        data: Bytes,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        info!("DoodStream upload started for: {} ({} bytes)", filename, data.len());

        let server = self.upload_server(credential).await?;

        let form = Form::new()
            .part("file", http::file_part(data, filename)?)
            .text("api_key", credential.expose().to_string())
            .text(
                "fld_id",
                options.folder_id.clone().unwrap_or_else(|| "0".to_string()),
            );

        let what = "DoodStream upload";
        let target = format!("{}?{}", server, credential.expose());
        let response = http::send(self.http.post(target).multipart(form), what).await?;
        let body = http::read_json(response, what).await?;
        http::ensure_ok(&body, "Upload failed")?;

        let first = body
            .get("result")
            .and_then(|r| r.get(0))
            .ok_or_else(|| {
                Error::UpstreamLogical("Upload completed but no file data returned".to_string())
            })?;

        let id = string_field(first, "filecode");
        let url = string_field(first, "download_url")
            .or_else(|| id.as_deref().map(|code| self.share_url(code)));

        info!("DoodStream upload finished for: {}", filename);
        Ok(UploadedFile { url, id })
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
        if let Some(title) = options.description.as_deref() {
            params.push(("new_title", title));
        }

        let body = self
            .call(credential, "upload/url", &params, "DoodStream remote upload")
            .await?;

        let id = body
            .get("result")
            .and_then(|r| string_field(r, "filecode"))
            .ok_or_else(|| {
                Error::UpstreamLogical("Remote upload accepted but no file code returned".to_string())
            })?;

        Ok(UploadedFile {
            url: Some(self.share_url(&id)),
            id: Some(id),
        })
    }

    async fn list_folder(&self, credential: &Credential, folder_id: &str) -> Result<Listing> {
        let what = "DoodStream folder list";
        let request = self
            .http
            .get(self.url("folder/list"))
            .query(&[
                ("key", credential.expose()),
                ("fld_id", folder_id),
                ("only_folders", "0"),
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
        self.call(
            credential,
            "folder/create",
            &[("name", name), ("parent_id", parent_id.unwrap_or("0"))],
            "DoodStream create folder",
        )
        .await
        .map(drop)
    }

    async fn rename_item(
        &self,
        credential: &Credential,
        id: &str,
        kind: ItemKind,
        new_name: &str,
    ) -> Result<()> {
        let (path, params) = match kind {
            ItemKind::Folder => ("folder/rename", [("fld_id", id), ("name", new_name)]),
            ItemKind::File => ("file/rename", [("file_code", id), ("title", new_name)]),
        };
        self.call(credential, path, &params, "DoodStream rename")
            .await
            .map(drop)
    }

    async fn move_file(&self, _credential: &Credential, _id: &str, _dest: &str) -> Result<()> {
        Err(Error::Unsupported(
            "File move not supported for DoodStream".to_string(),
        ))
    }

    async fn delete_item(&self, credential: &Credential, id: &str, kind: ItemKind) -> Result<()> {
        let (path, param) = match kind {
            ItemKind::Folder => ("folder/delete", ("fld_id", id)),
            ItemKind::File => ("file/delete", ("file_code", id)),
        };
        self.call(credential, path, &[param], "DoodStream delete")
            .await
            .map(drop)
    }

    async fn account_info(&self, credential: &Credential) -> Result<AccountInfo> {
        let body = self
            .call(credential, "account/info", &[], "DoodStream account info")
            .await?;
        let result = body.get("result").unwrap_or(&Value::Null);

        let used = u64_field(result, "storage_used");
        let left = u64_field(result, "storage_left");
        // The API spells it "premim_expire".
        let premium_expires = result
            .get("premim_expire")
            .or_else(|| result.get("premium_expire"));
        let is_premium = premium_expires
            .and_then(listing::parse_timestamp)
            .map(|expiry| expiry > Utc::now())
            .unwrap_or(false);

        let email = string_field(result, "email");
        Ok(AccountInfo {
            username: email.clone(),
            email,
            storage_used: used,
            storage_total: used.zip(left).map(|(u, l)| u.saturating_add(l)),
            balance: listing::f64_field(result, "balance"),
            currency: None,
            role: Some(if is_premium { "premium" } else { "free" }.to_string()),
            created_at: None,
            file_count: None,
            premium_expires_at: premium_expires
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}
