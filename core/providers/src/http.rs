//! HTTP plumbing shared by the adapters.
//!
//! Only transport concerns live here: client construction with explicit
//! timeouts, request sending, body decoding, and reading the `status`/`msg`
//! envelope fields most providers wrap their payloads in. What counts as
//! success stays with each adapter.

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::Part;
use reqwest::{header, Body, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use vidrelay_common::{Error, Result};

/// Longest slice of an upstream body quoted in an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout, uploads included.
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,
    /// User-Agent sent with every request unless an adapter overrides it.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            connect_timeout_secs: 15,
            user_agent: format!("vidrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Build a client honoring these settings.
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Validation(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Send a request, mapping connection failures and timeouts to transport errors.
pub(crate) async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            Error::UpstreamTransport(format!("{} timed out", what))
        } else {
            Error::UpstreamTransport(format!("{} request failed: {}", what, e))
        }
    })
}

/// Read a body as text, failing on transport errors only.
pub(crate) async fn read_text(response: Response, what: &str) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| Error::UpstreamTransport(format!("{}: failed to read response: {}", what, e)))
}

/// Require a 2xx status and a JSON body.
pub(crate) async fn read_json(response: Response, what: &str) -> Result<Value> {
    let status = response.status();
    let body = read_text(response, what).await?;

    if !status.is_success() {
        return Err(Error::UpstreamTransport(format!(
            "{} failed: {} - {}",
            what,
            status,
            excerpt(&body)
        )));
    }

    parse_json(&body, what)
}

/// Like [`read_json`], but first rejects responses whose content type is
/// not JSON. Some providers answer with an HTML error page and a 200.
pub(crate) async fn read_json_sniffed(response: Response, what: &str) -> Result<Value> {
    if !is_json(&response) {
        let body = read_text(response, what).await.unwrap_or_default();
        warn!("{} returned non-JSON response: {}", what, excerpt(&body));
        return Err(Error::UpstreamTransport(
            "Invalid API response format".to_string(),
        ));
    }
    read_json(response, what).await
}

/// Parse a JSON body already read as text.
pub(crate) fn parse_json(body: &str, what: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| Error::UpstreamTransport(format!("{}: invalid JSON response: {}", what, e)))
}

/// Whether the response declares a JSON content type.
pub(crate) fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false)
}

/// Multipart file part with a content type guessed from the file name.
pub(crate) fn file_part(data: Bytes, filename: &str) -> Result<Part> {
    let mime = mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("video/mp4");
    let length = data.len() as u64;

    Part::stream_with_length(Body::from(data), length)
        .file_name(filename.to_string())
        .mime_str(mime)
        .map_err(|e| Error::Validation(format!("Invalid content type {}: {}", mime, e)))
}

/// The envelope `status` field, whether sent as a number or a string.
pub(crate) fn status_of(body: &Value) -> Option<i64> {
    match body.get("status")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The envelope message, under `msg` or `message`.
pub(crate) fn message_of(body: &Value) -> Option<&str> {
    body.get("msg")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
}

/// Succeed when `status == 200`; otherwise surface the provider's message.
pub(crate) fn ensure_ok(body: &Value, fallback: &str) -> Result<()> {
    if status_of(body) == Some(200) {
        Ok(())
    } else {
        Err(logical_failure(body, fallback))
    }
}

/// Succeed when `status == 200` and `msg` equals `expected`.
pub(crate) fn ensure_ok_with_msg(body: &Value, expected: &str, fallback: &str) -> Result<()> {
    if status_of(body) == Some(200) && message_of(body) == Some(expected) {
        Ok(())
    } else {
        Err(logical_failure(body, fallback))
    }
}

fn logical_failure(body: &Value, fallback: &str) -> Error {
    Error::UpstreamLogical(message_of(body).unwrap_or(fallback).to_string())
}

/// First few hundred characters of a body, for log lines and errors.
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
