//! Pre-flight request validation.
//!
//! Everything here runs before any adapter is touched; a failure rejects the
//! whole request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use vidrelay_common::{Error, ProviderId, Result};

/// 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Size and type limits for uploaded files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Largest accepted file, in bytes.
    pub max_file_size: u64,
    /// Accepted MIME types. The defaults include the registered names of
    /// each container alongside the short aliases some clients send.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: [
                "video/mp4",
                "video/avi",
                "video/mov",
                "video/wmv",
                "video/flv",
                "video/webm",
                "video/mkv",
                "video/quicktime",
                "video/x-msvideo",
                "video/x-ms-wmv",
                "video/x-flv",
                "video/x-matroska",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl UploadLimits {
    /// Check one file against the limits.
    pub fn check_file(&self, filename: &str, size: u64, mime_type: &str) -> Result<()> {
        if size > self.max_file_size {
            return Err(Error::Validation(format!(
                "File {} exceeds maximum size of {}MB",
                filename,
                self.max_file_size / 1024 / 1024
            )));
        }
        if !self.allowed_mime_types.iter().any(|m| m == mime_type) {
            return Err(Error::Validation(format!(
                "File {} has unsupported type: {}",
                filename, mime_type
            )));
        }
        Ok(())
    }
}

/// Parse the requested target set.
///
/// # Errors
/// - `Validation` if the set is empty or names a provider twice
/// - `UnknownProvider` for any name outside the supported set
pub fn parse_targets<S: AsRef<str>>(names: &[S]) -> Result<Vec<ProviderId>> {
    if names.is_empty() {
        return Err(Error::Validation(
            "Providers must be a non-empty array".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(names.len());
    for name in names {
        let provider: ProviderId = name.as_ref().trim().parse()?;
        if !seen.insert(provider) {
            return Err(Error::Validation(format!(
                "Provider listed more than once: {}",
                provider
            )));
        }
        targets.push(provider);
    }
    Ok(targets)
}

/// Require an absolute http(s) URL for remote uploads.
pub fn check_remote_url(raw: &str) -> Result<()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Validation("URL is required".to_string()));
    }
    let url = Url::parse(raw).map_err(|e| Error::Validation(format!("Invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Validation(format!(
            "Unsupported URL scheme: {}",
            other
        ))),
    }
}

/// Require a non-blank item name.
pub fn check_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", what)));
    }
    Ok(())
}
