//! Request handlers.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use vidrelay_common::{ProviderId, UploadOptions};
use vidrelay_hub::{BatchReport, Hub, RemoteReport, UploadFile};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiMultipart, ApiPath, ApiQuery};
use crate::identity::{Admin, Identity};

pub async fn health() -> &'static str {
    "ok"
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request(format!("Malformed upload body: {}", err))
}

/// Declared part type, or a guess from the file name when absent or generic.
fn file_mime_type(declared: Option<&str>, filename: &str) -> String {
    match declared {
        Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => mime.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

pub async fn upload(
    State(hub): State<Hub>,
    identity: Identity,
    ApiMultipart(mut multipart): ApiMultipart,
) -> ApiResult<Json<BatchReport>> {
    let mut files = Vec::new();
    let mut providers = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = file_mime_type(field.content_type(), &filename);
                let data = field.bytes().await.map_err(multipart_error)?;
                debug!("Received {} ({}, {} bytes)", filename, mime_type, data.len());
                files.push(UploadFile::new(filename, mime_type, data));
            }
            "providers" => providers = Some(field.text().await.map_err(multipart_error)?),
            "folder_id" => {
                options.folder_id = non_empty(Some(field.text().await.map_err(multipart_error)?))
            }
            "description" => {
                options.description =
                    non_empty(Some(field.text().await.map_err(multipart_error)?))
            }
            other => debug!("Ignoring upload field {}", other),
        }
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }
    let providers = non_empty(providers).ok_or_else(|| ApiError::bad_request("No providers specified"))?;
    let providers: Vec<String> = serde_json::from_str(&providers)
        .map_err(|_| ApiError::bad_request("Invalid providers format"))?;

    let report = hub
        .orchestrator()
        .upload_files(&identity.user_id, files, &providers, &options)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RemoteUploadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn upload_remote(
    State(hub): State<Hub>,
    identity: Identity,
    ApiJson(req): ApiJson<RemoteUploadRequest>,
) -> ApiResult<Json<RemoteReport>> {
    if req.url.trim().is_empty() || req.providers.is_empty() {
        return Err(ApiError::bad_request("URL and providers are required"));
    }
    let options = UploadOptions {
        folder_id: non_empty(req.folder_id),
        description: non_empty(req.description),
    };
    let report = hub
        .orchestrator()
        .upload_remote(&identity.user_id, &req.url, &req.providers, &options)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub folder_id: Option<String>,
}

pub async fn list_folder(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(query): ApiQuery<FolderQuery>,
) -> ApiResult<Json<Value>> {
    let folder_id = non_empty(query.folder_id);
    let listing = hub
        .folders()
        .list(&identity.user_id, &provider, folder_id.as_deref())
        .await?;
    Ok(Json(json!({
        "total": listing.total(),
        "folders": listing.folders,
        "files": listing.files,
        "provider": provider,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

pub async fn create_folder(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath(provider): ApiPath<String>,
    ApiJson(req): ApiJson<CreateFolderRequest>,
) -> ApiResult<Json<Value>> {
    let parent_id = non_empty(req.parent_id);
    hub.folders()
        .create_folder(&identity.user_id, &provider, &req.name, parent_id.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn rename_folder(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath((provider, id)): ApiPath<(String, String)>,
    ApiJson(req): ApiJson<RenameRequest>,
) -> ApiResult<Json<Value>> {
    hub.folders()
        .rename_folder(&identity.user_id, &provider, &id, &req.name)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn rename_file(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath((provider, id)): ApiPath<(String, String)>,
    ApiJson(req): ApiJson<RenameRequest>,
) -> ApiResult<Json<Value>> {
    hub.folders()
        .rename_file(&identity.user_id, &provider, &id, &req.name)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub folder_id: String,
}

pub async fn move_file(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath((provider, id)): ApiPath<(String, String)>,
    ApiJson(req): ApiJson<MoveRequest>,
) -> ApiResult<Json<Value>> {
    hub.folders()
        .move_file(&identity.user_id, &provider, &id, req.folder_id.trim())
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_folder(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath((provider, id)): ApiPath<(String, String)>,
) -> ApiResult<Json<Value>> {
    hub.folders()
        .delete_folder(&identity.user_id, &provider, &id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_file(
    State(hub): State<Hub>,
    identity: Identity,
    ApiPath((provider, id)): ApiPath<(String, String)>,
) -> ApiResult<Json<Value>> {
    hub.folders()
        .delete_file(&identity.user_id, &provider, &id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn accounts(State(hub): State<Hub>, identity: Identity) -> ApiResult<Json<Value>> {
    let accounts = hub.accounts(&identity.user_id).await?;
    Ok(Json(json!({ "success": true, "accounts": accounts })))
}

pub async fn key_status(State(hub): State<Hub>, identity: Identity) -> ApiResult<Json<Value>> {
    let status = hub.keys().status(&identity.user_id)?;
    Ok(Json(json!({ "success": true, "providers": status })))
}

pub async fn allowed_providers(State(hub): State<Hub>, _identity: Identity) -> Json<Value> {
    Json(json!({ "success": true, "providers": hub.keys().allowed() }))
}

#[derive(Debug, Deserialize)]
pub struct SetKeyRequest {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
}

pub async fn set_key(
    State(hub): State<Hub>,
    identity: Identity,
    ApiJson(req): ApiJson<SetKeyRequest>,
) -> ApiResult<Json<Value>> {
    let key = non_empty(req.key);
    let (provider, key) = match (req.provider.trim(), key) {
        ("", _) | (_, None) => return Err(ApiError::bad_request("Provider and key are required")),
        (provider, Some(key)) => (provider.to_string(), key),
    };

    let provider = match non_empty(req.login) {
        Some(login) if provider == ProviderId::StreamTape.as_str() => {
            hub.keys().set_streamtape(&identity.user_id, &login, &key)?
        }
        _ => hub.keys().set(&identity.user_id, &provider, &key)?,
    };
    Ok(Json(json!({
        "success": true,
        "message": format!("API key for {} updated successfully", provider),
        "provider": provider,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteKeyRequest {
    #[serde(default)]
    pub provider: String,
}

pub async fn delete_key(
    State(hub): State<Hub>,
    identity: Identity,
    ApiJson(req): ApiJson<DeleteKeyRequest>,
) -> ApiResult<Json<Value>> {
    if req.provider.trim().is_empty() {
        return Err(ApiError::bad_request("Provider is required"));
    }
    let provider = hub.keys().delete(&identity.user_id, &req.provider)?;
    Ok(Json(json!({
        "success": true,
        "message": format!("API key for {} deleted successfully", provider),
        "provider": provider,
    })))
}

pub async fn history(State(hub): State<Hub>, identity: Identity) -> ApiResult<Json<Value>> {
    let history = hub.history(&identity.user_id)?;
    Ok(Json(json!({ "success": true, "history": history })))
}

pub async fn admin_keys(State(hub): State<Hub>, _admin: Admin) -> ApiResult<Json<Value>> {
    let keys = hub.keys().list_all()?;
    Ok(Json(json!({ "success": true, "keys": keys })))
}

pub async fn admin_history(State(hub): State<Hub>, _admin: Admin) -> ApiResult<Json<Value>> {
    let history = hub.all_history()?;
    Ok(Json(json!({ "success": true, "history": history })))
}

pub async fn admin_delete_key(
    State(hub): State<Hub>,
    Admin(admin): Admin,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let deleted = hub.keys().delete_by_id(&id)?;
    info!("Credential {} removed by admin {}", id, admin.user_id);
    Ok(Json(json!({
        "success": true,
        "message": format!("API key for {} deleted successfully", deleted.provider),
        "deleted": deleted,
    })))
}
