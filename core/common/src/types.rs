//! Common types used throughout vidrelay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{Error, Result};

/// A supported file-hosting provider.
///
/// The set is closed: anything else fails with [`Error::UnknownProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    DoodStream,
    StreamTape,
    VidGuard,
    BigWarp,
}

impl ProviderId {
    /// Every supported provider, in canonical order.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::DoodStream,
        ProviderId::StreamTape,
        ProviderId::VidGuard,
        ProviderId::BigWarp,
    ];

    /// Wire identifier (e.g. "doodstream").
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::DoodStream => "doodstream",
            ProviderId::StreamTape => "streamtape",
            ProviderId::VidGuard => "vidguard",
            ProviderId::BigWarp => "bigwarp",
        }
    }

    /// Human-facing name used in messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::DoodStream => "DoodStream",
            ProviderId::StreamTape => "StreamTape",
            ProviderId::VidGuard => "VidGuard",
            ProviderId::BigWarp => "BigWarp",
        }
    }

    /// Whether the stored secret is a composite `login:key` pair.
    pub fn uses_composite_credential(&self) -> bool {
        matches!(self, ProviderId::StreamTape)
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API secret for one (user, provider) pair.
///
/// The value is trimmed on construction and wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    /// Create a credential from raw input.
    ///
    /// # Errors
    /// - Returns error if the value is empty after trimming
    pub fn new(secret: impl AsRef<str>) -> Result<Self> {
        let trimmed = secret.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("API key cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Join a login and key into one composite secret.
    pub fn composite(login: &str, key: &str) -> Result<Self> {
        let login = login.trim();
        let key = key.trim();
        if login.is_empty() || key.is_empty() {
            return Err(Error::Validation(
                "Both login and key are required".to_string(),
            ));
        }
        let joined = Zeroizing::new(format!("{}:{}", login, key));
        Self::new(joined.as_str())
    }

    /// The raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Split a composite secret on its first `:`.
    ///
    /// # Errors
    /// - `MalformedCredential` if there is no delimiter or either half is empty
    pub fn split_composite(&self) -> Result<(&str, &str)> {
        match self.0.split_once(':') {
            Some((login, key)) if !login.is_empty() && !key.is_empty() => Ok((login, key)),
            _ => Err(Error::MalformedCredential(
                "StreamTape API key must be in format \"login:key\"".to_string(),
            )),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Optional hints passed alongside an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Destination folder id on the provider.
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Free-text description or title.
    #[serde(default)]
    pub description: Option<String>,
}

/// What a provider hands back for an accepted upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Canonical playback/download URL, when the provider exposes one.
    pub url: Option<String>,
    /// Provider-side file identifier.
    pub id: Option<String>,
}

/// Per-provider result of one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub provider: ProviderId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    /// A successful outcome.
    pub fn succeeded(provider: ProviderId, file: UploadedFile) -> Self {
        Self {
            provider,
            success: true,
            url: file.url,
            id: file.id,
            error: None,
        }
    }

    /// A failed outcome carrying a human-readable message.
    pub fn failed(provider: ProviderId, error: impl Into<String>) -> Self {
        Self {
            provider,
            success: false,
            url: None,
            id: None,
            error: Some(error.into()),
        }
    }

    /// Fold an adapter result into an outcome.
    pub fn from_result(provider: ProviderId, result: Result<UploadedFile>) -> Self {
        match result {
            Ok(file) => Self::succeeded(provider, file),
            Err(err) => Self::failed(provider, err.to_string()),
        }
    }
}

/// Aggregate status of a set of outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every provider succeeded.
    Success,
    /// Some providers succeeded.
    Partial,
    /// No provider succeeded.
    Failed,
}

impl BatchStatus {
    /// Classify a list of outcomes. An empty list counts as failed.
    pub fn from_outcomes(outcomes: &[UploadOutcome]) -> Self {
        let ok = outcomes.iter().filter(|o| o.success).count();
        if ok == 0 {
            BatchStatus::Failed
        } else if ok == outcomes.len() {
            BatchStatus::Success
        } else {
            BatchStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Success => "success",
            BatchStatus::Partial => "partial",
            BatchStatus::Failed => "failed",
        }
    }
}

/// Folder or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

/// One entry of a provider folder listing.
///
/// Folders only ever carry `id`, `name`, `kind` and possibly `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl ListingItem {
    /// A folder entry.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::Folder,
            size: None,
            created_at: None,
            url: None,
            thumbnail_url: None,
            view_count: None,
            duration_seconds: None,
        }
    }

    /// A file entry with no optional fields set.
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::File,
            ..Self::folder(id, name)
        }
    }
}

/// Folder contents split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub folders: Vec<ListingItem>,
    pub files: Vec<ListingItem>,
}

impl Listing {
    /// Number of entries across both halves.
    pub fn total(&self) -> usize {
        self.folders.len() + self.files.len()
    }

    /// One combined view with folders ahead of files.
    pub fn combined(&self) -> Vec<&ListingItem> {
        self.folders.iter().chain(self.files.iter()).collect()
    }
}

/// Normalized account details. Absent means unknown, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_expires_at: Option<String>,
}
