//! Adapter tests against local mock provider APIs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Query};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use tokio::net::TcpListener;

use vidrelay_common::{Credential, Error, ItemKind, UploadOptions};
use vidrelay_providers::{
    BigWarpEndpoints, BigWarpProvider, DoodStreamEndpoints, DoodStreamProvider, HostProvider,
    RetryConfig, StreamTapeEndpoints, StreamTapeProvider, VidGuardEndpoints, VidGuardProvider,
};

type Params = Query<HashMap<String, String>>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn spawn(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

/// Field names and file names of a multipart body.
async fn fields(mut multipart: Multipart) -> Vec<(String, Option<String>, String)> {
    let mut out = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let value = String::from_utf8_lossy(&field.bytes().await.unwrap()).to_string();
        out.push((name, file_name, value));
    }
    out
}

fn key(secret: &str) -> Credential {
    Credential::new(secret).unwrap()
}

fn fast_retry() -> RetryConfig {
    RetryConfig::linear(3, Duration::from_millis(5))
}

#[tokio::test]
async fn test_doodstream_two_step_upload() {
    let (listener, base) = bind().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let upload_query = Arc::new(Mutex::new(None));

    let server_url = format!("{}/srv/01", base);
    let seen_c = seen.clone();
    let query_c = upload_query.clone();
    let router = Router::new()
        .route(
            "/api/upload/server",
            get(move |Query(q): Params| async move {
                assert_eq!(q.get("key").map(String::as_str), Some("dood-key"));
                Json(json!({"status": 200, "msg": "OK", "result": server_url}))
            }),
        )
        .route(
            "/srv/01",
            post(move |raw: axum::http::Uri, multipart: Multipart| async move {
                *query_c.lock().unwrap() = raw.query().map(str::to_string);
                *seen_c.lock().unwrap() = fields(multipart).await;
                Json(json!({
                    "status": 200,
                    "result": [{"filecode": "abc123", "download_url": "https://dood.to/d/abc123"}]
                }))
            }),
        );
    spawn(listener, router);

    let provider = DoodStreamProvider::with_endpoints(
        reqwest::Client::new(),
        DoodStreamEndpoints {
            api_base: format!("{}/api", base),
            public_base: "https://dood.to".into(),
        },
    );

    let file = provider
        .upload(
            &key("dood-key"),
            Bytes::from_static(b"video-bytes"),
            "clip.mp4",
            &UploadOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(file.url.as_deref(), Some("https://dood.to/d/abc123"));
    assert_eq!(file.id.as_deref(), Some("abc123"));
    assert_eq!(upload_query.lock().unwrap().as_deref(), Some("dood-key"));

    let seen = seen.lock().unwrap().clone();
    let file_field = seen.iter().find(|(n, _, _)| n == "file").unwrap();
    assert_eq!(file_field.1.as_deref(), Some("clip.mp4"));
    assert_eq!(file_field.2, "video-bytes");
    assert!(seen.iter().any(|(n, _, v)| n == "api_key" && v == "dood-key"));
    assert!(seen.iter().any(|(n, _, v)| n == "fld_id" && v == "0"));
}

fn doodstream(base: &str) -> DoodStreamProvider {
    DoodStreamProvider::with_endpoints(
        reqwest::Client::new(),
        DoodStreamEndpoints {
            api_base: format!("{}/api", base),
            public_base: "https://dood.to".into(),
        },
    )
}

/// Router whose unmatched requests are counted.
fn counting_fallback(router: Router, hits: &Arc<AtomicUsize>) -> Router {
    let hits = hits.clone();
    router.fallback(move || async move {
        hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({"status": 200, "result": [{"filecode": "never"}]}))
    })
}

#[tokio::test]
async fn test_doodstream_missing_server_url_skips_upload() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/api/upload/server",
        get(|| async { Json(json!({"status": 200, "msg": "OK", "result": ""})) }),
    );
    spawn(listener, counting_fallback(router, &hits));

    let err = doodstream(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &UploadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamLogical(_)));
    assert!(!err.is_transient());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_doodstream_refused_server_lookup_skips_upload() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/api/upload/server",
        get(|| async { Json(json!({"status": 403, "msg": "Wrong Auth"})) }),
    );
    spawn(listener, counting_fallback(router, &hits));

    let err = doodstream(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &UploadOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to get upload server URL: Wrong Auth");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_doodstream_remote_upload() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/api/upload/url",
        get(|Query(q): Params| async move {
            assert_eq!(q.get("key").map(String::as_str), Some("k"));
            assert_eq!(q.get("url").map(String::as_str), Some("https://cdn.test/a.mp4"));
            assert_eq!(q.get("fld_id").map(String::as_str), Some("7"));
            assert_eq!(q.get("new_title").map(String::as_str), Some("Trip"));
            Json(json!({"status": 200, "msg": "OK", "result": {"filecode": "rm1"}}))
        }),
    );
    spawn(listener, router);

    let options = UploadOptions {
        folder_id: Some("7".into()),
        description: Some("Trip".into()),
    };
    let file = doodstream(&base)
        .upload_remote(&key("k"), "https://cdn.test/a.mp4", &options)
        .await
        .unwrap();
    assert_eq!(file.id.as_deref(), Some("rm1"));
    assert_eq!(file.url.as_deref(), Some("https://dood.to/d/rm1"));
}

#[tokio::test]
async fn test_doodstream_account_totals() {
    let (listener, base) = bind().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_c = calls.clone();
    let router = Router::new().route(
        "/api/account/info",
        get(move || async move {
            let result = if calls_c.fetch_add(1, Ordering::SeqCst) == 0 {
                json!({"email": "d@example.com", "storage_used": "100", "storage_left": 900})
            } else {
                json!({"storage_used": "1e30", "storage_left": "5"})
            };
            Json(json!({"status": 200, "result": result}))
        }),
    );
    spawn(listener, router);

    let provider = doodstream(&base);
    let info = provider.account_info(&key("k")).await.unwrap();
    assert_eq!(info.username.as_deref(), Some("d@example.com"));
    assert_eq!(info.storage_used, Some(100));
    assert_eq!(info.storage_total, Some(1000));
    assert_eq!(info.role.as_deref(), Some("free"));

    let info = provider.account_info(&key("k")).await.unwrap();
    assert_eq!(info.storage_used, Some(u64::MAX));
    assert_eq!(info.storage_total, Some(u64::MAX));
}

#[tokio::test]
async fn test_doodstream_listing_rejects_html() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/api/folder/list",
        get(|| async { Html("<html><body>Cloudflare</body></html>") }),
    );
    spawn(listener, router);

    let provider = DoodStreamProvider::with_endpoints(
        reqwest::Client::new(),
        DoodStreamEndpoints {
            api_base: format!("{}/api", base),
            public_base: base.clone(),
        },
    );

    let err = provider.list_folder(&key("k"), "0").await.unwrap_err();
    assert!(matches!(err, Error::UpstreamTransport(_)));
    assert_eq!(err.to_string(), "Invalid API response format");
}

#[tokio::test]
async fn test_doodstream_move_is_unsupported_without_request() {
    let provider = DoodStreamProvider::with_endpoints(
        reqwest::Client::new(),
        DoodStreamEndpoints {
            api_base: "http://127.0.0.1:1/api".into(),
            public_base: "http://127.0.0.1:1".into(),
        },
    );
    let err = provider.move_file(&key("k"), "f1", "9").await.unwrap_err();
    assert!(err.is_unsupported());
}

#[tokio::test]
async fn test_streamtape_malformed_credential_sends_nothing() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_c = hits.clone();
    let router = Router::new().fallback(move || async move {
        hits_c.fetch_add(1, Ordering::SeqCst);
        Json(json!({"status": 200, "result": {}}))
    });
    spawn(listener, router);

    let provider = StreamTapeProvider::with_endpoints(
        reqwest::Client::new(),
        StreamTapeEndpoints {
            api_base: base.clone(),
            public_base: base.clone(),
        },
    );

    let err = provider
        .upload(
            &key("just-a-key"),
            Bytes::from_static(b"x"),
            "a.mp4",
            &UploadOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedCredential(_)));
    assert!(provider.list_folder(&key("login:"), "0").await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_streamtape_html_upload_response() {
    let (listener, base) = bind().await;
    let ul_url = format!("{}/ul/xyz", base);
    let router = Router::new()
        .route(
            "/file/ul",
            get(move |Query(q): Params| async move {
                assert_eq!(q.get("login").map(String::as_str), Some("me"));
                assert_eq!(q.get("key").map(String::as_str), Some("secret"));
                Json(json!({"status": 200, "msg": "OK", "result": {"url": ul_url}}))
            }),
        )
        .route(
            "/ul/xyz",
            post(|multipart: Multipart| async move {
                let seen = fields(multipart).await;
                assert!(seen.iter().any(|(n, _, _)| n == "file1"));
                Html(r#"<html><a href="https://streamtape.com/v/Kq2x9/clip.mp4">done</a></html>"#)
            }),
        );
    spawn(listener, router);

    let provider = StreamTapeProvider::with_endpoints(
        reqwest::Client::new(),
        StreamTapeEndpoints {
            api_base: base.clone(),
            public_base: "https://streamtape.com".into(),
        },
    );

    let file = provider
        .upload(
            &key("me:secret"),
            Bytes::from_static(b"x"),
            "clip.mp4",
            &UploadOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(file.id.as_deref(), Some("Kq2x9"));
    assert_eq!(file.url.as_deref(), Some("https://streamtape.com/v/Kq2x9"));
}

#[tokio::test]
async fn test_streamtape_json_upload_response() {
    let (listener, base) = bind().await;
    let ul_url = format!("{}/ul/json", base);
    let router = Router::new()
        .route(
            "/file/ul",
            get(move |Query(q): Params| async move {
                assert_eq!(q.get("folder").map(String::as_str), Some("f9"));
                Json(json!({"status": 200, "msg": "OK", "result": {"url": ul_url}}))
            }),
        )
        .route(
            "/ul/json",
            post(|_multipart: Multipart| async {
                Json(json!({
                    "status": 200,
                    "msg": "OK",
                    "result": {"url": "https://streamtape.com/v/J1/clip.mp4", "id": "J1"}
                }))
            }),
        );
    spawn(listener, router);

    let options = UploadOptions {
        folder_id: Some("f9".into()),
        description: None,
    };
    let file = streamtape(&base)
        .upload(&key("me:secret"), Bytes::from_static(b"x"), "clip.mp4", &options)
        .await
        .unwrap();
    assert_eq!(file.id.as_deref(), Some("J1"));
    assert_eq!(file.url.as_deref(), Some("https://streamtape.com/v/J1/clip.mp4"));
}

#[tokio::test]
async fn test_streamtape_remote_upload() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/remotedl/add",
        get(|Query(q): Params| async move {
            assert_eq!(q.get("login").map(String::as_str), Some("me"));
            assert_eq!(q.get("key").map(String::as_str), Some("secret"));
            assert_eq!(q.get("url").map(String::as_str), Some("https://cdn.test/a.mp4"));
            Json(json!({"status": 200, "msg": "OK", "result": {"id": "rd9", "folderid": "0"}}))
        }),
    );
    spawn(listener, router);

    let file = streamtape(&base)
        .upload_remote(&key("me:secret"), "https://cdn.test/a.mp4", &UploadOptions::default())
        .await
        .unwrap();
    assert_eq!(file.id.as_deref(), Some("rd9"));
    assert!(file.url.is_none());
}

#[tokio::test]
async fn test_streamtape_logical_failure_surfaces_message() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/file/move",
        get(|| async { Json(json!({"status": 403, "msg": "Permission denied"})) }),
    );
    spawn(listener, router);

    let provider = StreamTapeProvider::with_endpoints(
        reqwest::Client::new(),
        StreamTapeEndpoints {
            api_base: base.clone(),
            public_base: base.clone(),
        },
    );
    let err = provider.move_file(&key("me:secret"), "f", "d").await.unwrap_err();
    assert!(matches!(err, Error::UpstreamLogical(_)));
    assert_eq!(err.to_string(), "Permission denied");
}

fn streamtape(base: &str) -> StreamTapeProvider {
    StreamTapeProvider::with_endpoints(
        reqwest::Client::new(),
        StreamTapeEndpoints {
            api_base: base.to_string(),
            public_base: "https://streamtape.com".into(),
        },
    )
}

fn vidguard(base: &str) -> VidGuardProvider {
    VidGuardProvider::with_endpoints(
        reqwest::Client::new(),
        VidGuardEndpoints {
            api_base: format!("{}/v1", base),
            public_base: "https://vidguard.to".into(),
        },
    )
}

#[tokio::test]
async fn test_vidguard_two_step_upload() {
    let (listener, base) = bind().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_c = seen.clone();
    let server_url = format!("{}/vg-up", base);
    let router = Router::new()
        .route(
            "/v1/upload/server",
            get(move |Query(q): Params| async move {
                assert_eq!(q.get("key").map(String::as_str), Some("vg-key"));
                Json(json!({"status": 200, "msg": "Done", "result": {"url": server_url}}))
            }),
        )
        .route(
            "/vg-up",
            post(move |multipart: Multipart| async move {
                *seen_c.lock().unwrap() = fields(multipart).await;
                Json(json!({"status": 200, "msg": "Done", "result": {"HashID": "abc"}}))
            }),
        );
    spawn(listener, router);

    let options = UploadOptions {
        folder_id: Some("4".into()),
        description: None,
    };
    let file = vidguard(&base)
        .upload(&key("vg-key"), Bytes::from_static(b"video"), "clip.mp4", &options)
        .await
        .unwrap();
    assert_eq!(file.id.as_deref(), Some("abc"));
    assert_eq!(file.url.as_deref(), Some("https://vidguard.to/v/abc"));

    let seen = seen.lock().unwrap().clone();
    assert!(seen.iter().any(|(n, f, _)| n == "file" && f.as_deref() == Some("clip.mp4")));
    assert!(seen.iter().any(|(n, _, v)| n == "key" && v == "vg-key"));
    assert!(seen.iter().any(|(n, _, v)| n == "folder" && v == "4"));
}

#[tokio::test]
async fn test_vidguard_missing_server_url_skips_upload() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/v1/upload/server",
        get(|| async { Json(json!({"status": 200, "msg": "Done", "result": {}})) }),
    );
    spawn(listener, counting_fallback(router, &hits));

    let err = vidguard(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &UploadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamLogical(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_vidguard_remote_upload() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/v1/remote/upload",
        post(|multipart: Multipart| async move {
            let seen = fields(multipart).await;
            assert!(seen.iter().any(|(n, _, v)| n == "url" && v == "https://cdn.test/a.mp4"));
            assert!(seen.iter().any(|(n, _, v)| n == "key" && v == "k"));
            Json(json!({"status": 200, "msg": "Done", "result": [{"HashID": "r1"}]}))
        }),
    );
    spawn(listener, router);

    let file = vidguard(&base)
        .upload_remote(&key("k"), "https://cdn.test/a.mp4", &UploadOptions::default())
        .await
        .unwrap();
    assert_eq!(file.id.as_deref(), Some("r1"));
    assert_eq!(file.url.as_deref(), Some("https://vidguard.to/v/r1"));
}

#[tokio::test]
async fn test_vidguard_listing_survives_failed_folder_call() {
    let (listener, base) = bind().await;
    let router = Router::new()
        .route(
            "/v1/folder/list",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route(
            "/v1/video/list",
            get(|Query(q): Params| async move {
                assert_eq!(q.get("limit").map(String::as_str), Some("100"));
                assert_eq!(q.get("deleted").map(String::as_str), Some("0"));
                Json(json!({
                    "status": 200,
                    "msg": "Done",
                    "result": [
                        {"HashID": "h1", "Name": "a.mp4", "Size": 10, "Views": 2},
                        {"Name": "no id, dropped"}
                    ]
                }))
            }),
        );
    spawn(listener, router);

    let listing = vidguard(&base).list_folder(&key("k"), "0").await.unwrap();
    assert!(listing.folders.is_empty());
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].url.as_deref(), Some("https://vidguard.to/v/h1"));
    assert_eq!(listing.files[0].kind, ItemKind::File);
}

#[tokio::test]
async fn test_vidguard_listing_requires_done_marker_for_videos() {
    let (listener, base) = bind().await;
    let router = Router::new()
        .route(
            "/v1/folder/list",
            get(|| async {
                Json(json!({"status": 200, "result": [{"ID": 4, "name": "clips"}]}))
            }),
        )
        .route(
            "/v1/video/list",
            get(|| async {
                Json(json!({"status": 200, "msg": "OK", "result": [{"HashID": "h1"}]}))
            }),
        );
    spawn(listener, router);

    let listing = vidguard(&base).list_folder(&key("k"), "0").await.unwrap();
    assert_eq!(listing.folders.len(), 1);
    assert_eq!(listing.folders[0].id, "4");
    assert!(listing.files.is_empty());
}

#[tokio::test]
async fn test_vidguard_move_requires_done_marker() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/v1/video/move",
        get(|| async { Json(json!({"status": 200, "msg": "OK"})) }),
    );
    spawn(listener, router);

    let err = vidguard(&base)
        .move_file(&key("k"), "h1", "4")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamLogical(_)));
}

#[tokio::test]
async fn test_vidguard_file_rename_unsupported() {
    let err = vidguard("http://127.0.0.1:1")
        .rename_item(&key("k"), "h1", ItemKind::File, "new")
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
}

fn bigwarp(base: &str) -> BigWarpProvider {
    BigWarpProvider::with_endpoints(
        reqwest::Client::new(),
        BigWarpEndpoints {
            api_base: format!("{}/api", base),
            public_base: "https://bigwarp.io".into(),
        },
    )
    .with_retry(fast_retry())
}

#[tokio::test]
async fn test_bigwarp_retries_overloaded_server_lookup() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_c = hits.clone();
    let upload_url = format!("{}/up", base);

    let router = Router::new()
        .route(
            "/api/upload/server",
            get(move |headers: axum::http::HeaderMap| async move {
                let agent = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                assert!(agent.starts_with("Mozilla/5.0"));
                if hits_c.fetch_add(1, Ordering::SeqCst) < 2 {
                    StatusCode::SERVICE_UNAVAILABLE.into_response()
                } else {
                    Json(json!({"status": 200, "result": upload_url})).into_response()
                }
            }),
        )
        .route(
            "/up",
            post(|multipart: Multipart| async move {
                let seen = fields(multipart).await;
                assert!(seen.iter().any(|(n, _, v)| n == "html_redirect" && v == "0"));
                assert!(seen.iter().any(|(n, _, v)| n == "file_title" && v == "Holiday"));
                Json(json!({"status": 200, "files": [{"filecode": "bw1", "status": "OK"}]}))
            }),
        );
    spawn(listener, router);

    let options = UploadOptions {
        folder_id: None,
        description: Some("Holiday".into()),
    };
    let file = bigwarp(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &options)
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(file.url.as_deref(), Some("https://bigwarp.io/bw1.html"));
}

#[tokio::test]
async fn test_bigwarp_exhausted_retries_report_overload() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_c = hits.clone();
    let router = Router::new().route(
        "/api/upload/server",
        get(move || async move {
            hits_c.fetch_add(1, Ordering::SeqCst);
            StatusCode::BAD_GATEWAY
        }),
    );
    spawn(listener, router);

    let err = bigwarp(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &UploadOptions::default())
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(
        err.to_string(),
        "BigWarp servers are temporarily overloaded. Please try again in a few minutes."
    );
}

#[tokio::test]
async fn test_bigwarp_logical_refusal_not_retried() {
    let (listener, base) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_c = hits.clone();
    let router = Router::new().route(
        "/api/upload/server",
        get(move || async move {
            hits_c.fetch_add(1, Ordering::SeqCst);
            Json(json!({"status": 403, "msg": "Invalid key"}))
        }),
    );
    spawn(listener, router);

    let err = bigwarp(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &UploadOptions::default())
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(err.to_string(), "BigWarp upload servers unavailable: Invalid key");
}

#[tokio::test]
async fn test_bigwarp_html_500_on_upload() {
    let (listener, base) = bind().await;
    let upload_url = format!("{}/up", base);
    let router = Router::new()
        .route(
            "/api/upload/server",
            get(move || async move { Json(json!({"status": 200, "result": upload_url})) }),
        )
        .route(
            "/up",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<html><body>overloaded</body></html>"),
                )
            }),
        );
    spawn(listener, router);

    let err = bigwarp(&base)
        .upload(&key("k"), Bytes::from_static(b"x"), "a.mp4", &UploadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Service Temporarily Unavailable - Server overloaded, please try again later"
    );
}

#[tokio::test]
async fn test_bigwarp_account_info() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/api/account/info",
        get(|| async {
            Json(json!({
                "status": 200,
                "result": {
                    "login": "warp",
                    "email": "w@example.com",
                    "storage_used": "100",
                    "storage_left": "900",
                    "balance": "1.50",
                    "premium": 1,
                    "files_total": "12"
                }
            }))
        }),
    );
    spawn(listener, router);

    let info = bigwarp(&base).account_info(&key("k")).await.unwrap();
    assert_eq!(info.username.as_deref(), Some("warp"));
    assert_eq!(info.storage_total, Some(1000));
    assert_eq!(info.balance, Some(1.5));
    assert_eq!(info.role.as_deref(), Some("premium"));
    assert_eq!(info.file_count, Some(12));
    assert!(info.created_at.is_none());
}

#[tokio::test]
async fn test_bigwarp_remote_upload() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/api/upload/url",
        get(|Query(q): Params| async move {
            assert_eq!(q.get("url").map(String::as_str), Some("https://cdn.test/a.mp4"));
            Json(json!({"status": 200, "result": {"filecode": "bwr"}}))
        }),
    );
    spawn(listener, router);

    let file = bigwarp(&base)
        .upload_remote(&key("k"), "https://cdn.test/a.mp4", &UploadOptions::default())
        .await
        .unwrap();
    assert_eq!(file.url.as_deref(), Some("https://bigwarp.io/bwr.html"));
}

#[tokio::test]
async fn test_bigwarp_account_totals_saturate() {
    let (listener, base) = bind().await;
    let router = Router::new().route(
        "/api/account/info",
        get(|| async {
            Json(json!({
                "status": 200,
                "result": {"storage_used": "1e30", "storage_left": "5"}
            }))
        }),
    );
    spawn(listener, router);

    let info = bigwarp(&base).account_info(&key("k")).await.unwrap();
    assert_eq!(info.storage_total, Some(u64::MAX));
}

#[tokio::test]
async fn test_transport_status_error_is_reported() {
    let (listener, base) = bind().await;
    let router: Router = Router::new().route(
        "/api/account/info",
        get(|| async {
            Response::builder()
                .status(401)
                .body(axum::body::Body::from("nope"))
                .unwrap()
        }),
    );
    spawn(listener, router);

    let provider = DoodStreamProvider::with_endpoints(
        reqwest::Client::new(),
        DoodStreamEndpoints {
            api_base: format!("{}/api", base),
            public_base: base.clone(),
        },
    );
    let err = provider.account_info(&key("k")).await.unwrap_err();
    assert!(err.is_transient());
    assert!(err.to_string().contains("401"));
}
