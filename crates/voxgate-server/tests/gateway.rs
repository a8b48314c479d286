//! End-to-end tests: real sockets, a stub ASR backend, and shell
//! utilities standing in for the decoder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;

use voxgate_archive::{Archiver, MemoryStore, ObjectStore};
use voxgate_core::config::GatewayConfig;
use voxgate_core::sniff;
use voxgate_decode::DecodeConfig;
use voxgate_server::{start, AppState, ServerHandle};

#[derive(Clone)]
struct AsrStubState {
    reply: String,
    hits: Arc<AtomicUsize>,
    last_language: Arc<Mutex<Option<String>>>,
}

struct AsrStub {
    url: String,
    hits: Arc<AtomicUsize>,
    last_language: Arc<Mutex<Option<String>>>,
}

async fn stub_asr(reply: &str) -> AsrStub {
    let state = AsrStubState {
        reply: reply.to_string(),
        hits: Arc::new(AtomicUsize::new(0)),
        last_language: Arc::new(Mutex::new(None)),
    };
    let hits = Arc::clone(&state.hits);
    let last_language = Arc::clone(&state.last_language);

    let app = Router::new()
        .route(
            "/asr",
            post(
                |State(s): State<AsrStubState>, headers: HeaderMap, _body: axum::body::Bytes| async move {
                    let _ = s.hits.fetch_add(1, Ordering::SeqCst);
                    *s.last_language.lock() = headers
                        .get("accept-language")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    s.reply.clone()
                },
            ),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    }));

    AsrStub {
        url: format!("http://{addr}/asr"),
        hits,
        last_language,
    }
}

struct TestGateway {
    base: String,
    asr: AsrStub,
    store: Arc<MemoryStore>,
    dir: tempfile::TempDir,
    _handle: ServerHandle,
}

async fn gateway_with(
    asr_reply: &str,
    decode_cmd: &[&str],
    store: Arc<MemoryStore>,
    tweak: impl FnOnce(&mut GatewayConfig),
) -> TestGateway {
    let asr = stub_asr(asr_reply).await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = GatewayConfig {
        port: 0,
        asr_url: asr.url.clone(),
        heartbeat_file: dir.path().join("hb.raw").display().to_string(),
        version_file: dir.path().join("version.json").display().to_string(),
        ..Default::default()
    };
    tweak(&mut config);

    let archiver = Archiver::new(Arc::clone(&store) as Arc<dyn ObjectStore>);
    let state = AppState::new(config, DecodeConfig::with_command(decode_cmd), Some(archiver));
    let handle = start(state).await.unwrap();

    TestGateway {
        base: format!("http://127.0.0.1:{}", handle.port),
        asr,
        store,
        dir,
        _handle: handle,
    }
}

async fn gateway(asr_reply: &str, decode_cmd: &[&str]) -> TestGateway {
    gateway_with(asr_reply, decode_cmd, Arc::new(MemoryStore::new()), |_| {}).await
}

/// Give the fire-and-forget archive tasks a moment to settle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn valid_opus_roundtrips_the_backend_json() {
    let gw = gateway(r#"{"data":[{"text":"HELLO"}]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"data":[{"text":"HELLO"}]}));
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 1);

    // All three artifacts land under one shared prefix.
    settle().await;
    let keys = gw.store.keys();
    assert_eq!(keys.len(), 3, "keys: {keys:?}");
    let prefix = keys[0].rsplitn(2, '/').nth(1).unwrap().to_string();
    for key in &keys {
        assert!(key.starts_with(&prefix), "{key} vs {prefix}");
    }
    assert!(keys.iter().any(|k| k.ends_with("/audio.opus")));
    assert!(keys.iter().any(|k| k.ends_with("/metadata.json")));
    assert!(keys.iter().any(|k| k.ends_with("/transcript.json")));
}

#[tokio::test]
async fn short_body_is_rejected_without_decode_or_forward() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(vec![0x4fu8, 0x67])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Body should be Opus or WebM/3GP audio");
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 0);
    settle().await;
    assert!(gw.store.is_empty());
}

#[tokio::test]
async fn invalid_store_flag_names_the_field() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .header("store-sample", "2")
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid header: Store-Sample");
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_language_tag_is_rejected() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .header("accept-language", "eng")
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid header: Accept-Language");
}

#[tokio::test]
async fn validated_language_is_forwarded_upstream() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .header("accept-language", "en-US")
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(gw.asr.last_language.lock().as_deref(), Some("en-US"));
}

#[tokio::test]
async fn decoder_failure_never_reaches_the_forwarder() {
    let gw = gateway(r#"{"data":[]}"#, &["sh", "-c", "echo bad input >&2; exit 1"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Internal STT Server Error");
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_hypothesis_list_roundtrips() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"data": []}));
}

#[tokio::test]
async fn malformed_upstream_reply_is_a_generic_500() {
    let gw = gateway("lexicon exploded at line 3", &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let text = resp.text().await.unwrap();
    assert!(text.contains("Internal STT Server Error"));
    assert!(!text.contains("lexicon"), "backend detail leaked: {text}");
}

#[tokio::test]
async fn archive_failure_does_not_change_the_response() {
    let gw = gateway_with(
        r#"{"data":[{"text":"HELLO"}]}"#,
        &["cat"],
        Arc::new(MemoryStore::failing()),
        |_| {},
    )
    .await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"data":[{"text":"HELLO"}]}));
    settle().await;
    assert!(gw.store.is_empty());
}

#[tokio::test]
async fn store_flags_disable_archiving() {
    let gw = gateway(r#"{"data":[{"text":"HELLO"}]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .header("store-sample", "0")
        .header("store-transcription", "0")
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    settle().await;
    assert!(gw.store.is_empty(), "stored: {:?}", gw.store.keys());
}

#[tokio::test]
async fn post_works_on_any_path() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/some/audio/path", gw.base))
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn post_works_on_reserved_health_paths() {
    // The reserved paths are GET endpoints, but a POST to them is
    // still an audio upload like any other path.
    let gw = gateway(r#"{"data":[{"text":"HELLO"}]}"#, &["cat"]).await;

    for path in ["/__lbheartbeat__", "/__heartbeat__", "/__version__"] {
        let resp = reqwest::Client::new()
            .post(format!("{}{path}", gw.base))
            .body(sniff::opus_preamble())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "path {path}");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, serde_json::json!({"data":[{"text":"HELLO"}]}), "path {path}");
    }
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn stalled_decoder_times_out_with_a_generic_500() {
    // sleep holds stdout open without producing output, so only the
    // decode bound can end the request.
    let gw = gateway_with(
        r#"{"data":[]}"#,
        &["sh", "-c", "sleep 5"],
        Arc::new(MemoryStore::new()),
        |config| config.decode_timeout = Duration::from_millis(300),
    )
    .await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Internal STT Server Error");
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_upstream_times_out_with_a_generic_500() {
    let app = Router::new().route(
        "/asr",
        post(|_body: axum::body::Bytes| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            r#"{"data":[]}"#
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    }));
    let slow_url = format!("http://{addr}/asr");

    let gw = gateway_with(
        r#"{"data":[]}"#,
        &["cat"],
        Arc::new(MemoryStore::new()),
        move |config| {
            config.asr_url = slow_url;
            config.upstream_timeout = Duration::from_millis(300);
        },
    )
    .await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(sniff::opus_preamble())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Internal STT Server Error");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let gw = gateway_with(
        r#"{"data":[]}"#,
        &["cat"],
        Arc::new(MemoryStore::new()),
        |config| config.max_body_bytes = 64,
    )
    .await;

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(vec![0u8; 512])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 413);
    assert_eq!(gw.asr.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn version_endpoint_serves_the_descriptor() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;
    std::fs::write(
        gw.dir.path().join("version.json"),
        r#"{"version":"1.2.3","commit":"abc123"}"#,
    )
    .unwrap();

    let resp = reqwest::get(format!("{}/__version__", gw.base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["version"], "1.2.3");
}

#[tokio::test]
async fn missing_version_descriptor_is_a_500() {
    let gw = gateway(r#"{"data":[]}"#, &["cat"]).await;
    let resp = reqwest::get(format!("{}/__version__", gw.base)).await.unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn heartbeat_is_healthy_on_sentinel_reply() {
    let gw = gateway(r#"{"data":[{"text":"HEART BEAT"}]}"#, &["cat"]).await;
    std::fs::write(gw.dir.path().join("hb.raw"), b"canned sample").unwrap();

    let resp = reqwest::get(format!("{}/__heartbeat__", gw.base)).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn heartbeat_is_unhealthy_without_sentinel() {
    let gw = gateway(r#"{"data":[{"text":"SOMETHING ELSE"}]}"#, &["cat"]).await;
    std::fs::write(gw.dir.path().join("hb.raw"), b"canned sample").unwrap();

    let resp = reqwest::get(format!("{}/__heartbeat__", gw.base)).await.unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn heartbeat_tolerates_a_missing_sample_file() {
    // No hb.raw written: the probe sends an empty payload and the
    // verdict comes from the reply alone.
    let gw = gateway(r#"{"data":[{"text":"HEART BEAT"}]}"#, &["cat"]).await;
    let resp = reqwest::get(format!("{}/__heartbeat__", gw.base)).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn webm_body_uses_the_transcoder_path() {
    let gw = gateway(r#"{"data":[{"text":"WEBM"}]}"#, &["cat"]).await;

    let mut body = vec![0x1A, 0x45, 0xDF, 0xA3];
    body.extend_from_slice(&[0x42, 0x86, 0x81, 0x01]);

    let resp = reqwest::Client::new()
        .post(&gw.base)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    settle().await;
    assert!(gw.store.keys().iter().any(|k| k.ends_with("/audio.webm")));
}
