//! StreamTape adapter.
//!
//! The stored secret is a composite `login:key`; it is split before any
//! request goes out. Uploads go to a per-request upload URL handed out by
//! `file/ul`, and that endpoint sometimes answers with an HTML page instead
//! of JSON, so the share link is scraped from the body in that case.

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder};
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

const API_BASE: &str = "https://api.streamtape.com";
const PUBLIC_BASE: &str = "https://streamtape.com";

/// Base URLs for the StreamTape API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamTapeEndpoints {
    pub api_base: String,
    pub public_base: String,
}

impl Default for StreamTapeEndpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            public_base: PUBLIC_BASE.to_string(),
        }
    }
}

/// StreamTape provider.
pub struct StreamTapeProvider {
    http: Client,
    endpoints: StreamTapeEndpoints,
}

impl StreamTapeProvider {
    pub fn new(http: Client) -> Self {
        Self::with_endpoints(http, StreamTapeEndpoints::default())
    }

    pub fn with_endpoints(http: Client, endpoints: StreamTapeEndpoints) -> Self {
        Self { http, endpoints }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    /// GET request authenticated with the split credential.
    fn get(
        &self,
        credential: &Credential,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<RequestBuilder> {
        let (login, key) = credential.split_composite()?;
        Ok(self
            .http
            .get(self.url(path))
            .query(&[("login", login), ("key", key)])
            .query(params))
    }

    async fn call(
        &self,
        credential: &Credential,
        path: &str,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<Value> {
        let request = self.get(credential, path, params)?;
        let response = http::send(request, what).await?;
        let body = http::read_json(response, what).await?;
        http::ensure_ok(&body, &format!("{} failed", what))?;
        Ok(body)
    }

    /// Pull `<public>/v/<id>` out of an HTML or plain-text upload response.
    fn scrape_share_link(&self, body: &str) -> Option<UploadedFile> {
        let base = self.endpoints.public_base.trim_end_matches('/');
        let pattern = format!(r"{}/v/([A-Za-z0-9_-]+)", regex::escape(base));
        let re = Regex::new(&pattern).ok()?;
        let caps = re.captures(body)?;
        let id = caps.get(1)?.as_str().to_string();
        Some(UploadedFile {
            url: Some(caps.get(0)?.as_str().to_string()),
            id: Some(id),
        })
    }

    fn parse_folder(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "id")?;
        Some(ListingItem::folder(
            id,
            string_field(value, "name").unwrap_or_default(),
        ))
    }

    fn parse_file(value: &Value) -> Option<ListingItem> {
        let id = string_field(value, "linkid")?;
        let mut item = ListingItem::file(id, string_field(value, "name").unwrap_or_default());
        item.size = u64_field(value, "size");
        item.created_at = timestamp_field(value, "created_at");
        item.url = string_field(value, "link");
        item.thumbnail_url = string_field(value, "thumbnail");
        item.view_count = u64_field(value, "downloads");
        item.duration_seconds = u64_field(value, "duration");
        Some(item)
    }
}

#[async_trait]
impl HostProvider for StreamTapeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::StreamTape
    }

    async fn upload(
        &self,
        credential: &Credential,
        data: Bytes,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        info!("StreamTape upload started for: {} ({} bytes)", filename, data.len());

        let mut params = Vec::new();
        if let Some(folder) = options.folder_id.as_deref() {
            params.push(("folder", folder));
        }
        let body = self
            .call(credential, "file/ul", &params, "StreamTape upload URL request")
            .await?;

        let upload_url = body
            .get("result")
            .and_then(|r| string_field(r, "url"))
            .ok_or_else(|| {
                Error::UpstreamLogical(
                    http::message_of(&body)
                        .unwrap_or("Failed to get upload URL")
                        .to_string(),
                )
            })?;
        debug!("StreamTape upload URL obtained");

        let form = Form::new().part("file1", http::file_part(data, filename)?);
        let what = "StreamTape upload";
        let response = http::send(self.http.post(upload_url).multipart(form), what).await?;
        let status = response.status();
        let is_json = http::is_json(&response);
        let text = http::read_text(response, what).await?;

        if !status.is_success() {
            return Err(Error::UpstreamTransport(format!(
                "{} failed: {} - {}",
                what,
                status,
                http::excerpt(&text)
            )));
        }

        if is_json {
            let body = http::parse_json(&text, what)?;
            http::ensure_ok(&body, "Upload failed")?;
            let result = body.get("result").unwrap_or(&Value::Null);
            let file = UploadedFile {
                url: string_field(result, "url"),
                id: string_field(result, "id"),
            };
            if file.url.is_none() && file.id.is_none() {
                return Err(Error::UpstreamLogical(
                    "Upload completed but no file data returned".to_string(),
                ));
            }
            info!("StreamTape upload finished for: {}", filename);
            return Ok(file);
        }

        match self.scrape_share_link(&text) {
            Some(file) => {
                info!("StreamTape upload finished for: {}", filename);
                Ok(file)
            }
            None => {
                warn!("StreamTape upload returned unexpected body: {}", http::excerpt(&text));
                Err(Error::UpstreamTransport(
                    "Upload response did not contain a file link".to_string(),
                ))
            }
        }
    }

    async fn upload_remote(
        &self,
        credential: &Credential,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedFile> {
        let mut params = vec![("url", source_url)];
        if let Some(folder) = options.folder_id.as_deref() {
            params.push(("folder", folder));
        }
        let body = self
            .call(credential, "remotedl/add", &params, "StreamTape remote upload")
            .await?;

        let id = body
            .get("result")
            .and_then(|r| string_field(r, "id"))
            .ok_or_else(|| {
                Error::UpstreamLogical("Remote upload accepted but no id returned".to_string())
            })?;
        Ok(UploadedFile { url: None, id: Some(id) })
    }

    async fn list_folder(&self, credential: &Credential, folder_id: &str) -> Result<Listing> {
        let what = "StreamTape folder list";
        let request = self.get(credential, "file/listfolder", &[("folder", folder_id)])?;
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
        let mut params = vec![("name", name)];
        if let Some(pid) = parent_id.filter(|p| *p != "0") {
            params.push(("pid", pid));
        }
        self.call(credential, "file/createfolder", &params, "StreamTape create folder")
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
            ItemKind::Folder => ("file/renamefolder", [("folder", id), ("name", new_name)]),
            ItemKind::File => ("file/rename", [("file", id), ("name", new_name)]),
        };
        self.call(credential, path, &params, "StreamTape rename")
            .await
            .map(drop)
    }

    async fn move_file(&self, credential: &Credential, id: &str, dest: &str) -> Result<()> {
        self.call(
            credential,
            "file/move",
            &[("file", id), ("folder", dest)],
            "StreamTape move",
        )
        .await
        .map(drop)
    }

    async fn delete_item(&self, credential: &Credential, id: &str, kind: ItemKind) -> Result<()> {
        let (path, param) = match kind {
            ItemKind::Folder => ("file/deletefolder", ("folder", id)),
            ItemKind::File => ("file/delete", ("file", id)),
        };
        self.call(credential, path, &[param], "StreamTape delete")
            .await
            .map(drop)
    }

    async fn account_info(&self, credential: &Credential) -> Result<AccountInfo> {
        let (login, _) = credential.split_composite()?;
        let body = self
            .call(credential, "account/info", &[], "StreamTape account info")
            .await?;
        let result = body.get("result").unwrap_or(&Value::Null);

        Ok(AccountInfo {
            username: Some(login.to_string()),
            email: string_field(result, "email"),
            created_at: timestamp_field(result, "signup_at"),
            ..AccountInfo::default()
        })
    }
}
