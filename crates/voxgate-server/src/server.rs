use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use voxgate_archive::Archiver;
use voxgate_asr::AsrClient;
use voxgate_core::config::GatewayConfig;
use voxgate_core::context::RequestMeta;
use voxgate_core::errors::PipelineError;
use voxgate_core::ids::RequestId;
use voxgate_decode::DecodeConfig;

use crate::health;
use crate::middleware;
use crate::pipeline;

/// Shared application state passed to Axum handlers. Everything in
/// here is read-only per request; each request's subprocess, streams,
/// and buffers are exclusively its own.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub decode: Arc<DecodeConfig>,
    pub asr: AsrClient,
    pub archiver: Option<Archiver>,
}

impl AppState {
    pub fn new(config: GatewayConfig, decode: DecodeConfig, archiver: Option<Archiver>) -> Self {
        let asr = AsrClient::new(config.asr_url.clone(), config.upstream_timeout);
        Self {
            config: Arc::new(config),
            decode: Arc::new(decode),
            asr,
            archiver,
        }
    }
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;
    Router::new()
        // A POST to any path, the reserved GET endpoints included,
        // carries an audio body.
        .route(
            "/__lbheartbeat__",
            get(lbheartbeat_handler).post(recognize_handler),
        )
        .route("/__heartbeat__", get(heartbeat_handler).post(recognize_handler))
        .route("/__version__", get(version_handler).post(recognize_handler))
        .route("/", get(lbheartbeat_handler).post(recognize_handler))
        .route("/{*path}", post(recognize_handler))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CorsLayer::permissive())
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::request_log))
}

/// Bind and serve. Returns a handle carrying the bound port, so
/// tests can start on port 0.
pub async fn start(state: AppState) -> Result<ServerHandle, std::io::Error> {
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let router = build_router(state);
    tracing::info!(port = local_addr.port(), "voxgate listening");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()`. Keeps the accept loop alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// Trivial liveness payload, also served at `/`.
async fn lbheartbeat_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "Okay"}))
}

/// Deep health: canned sample through the ASR path, sentinel check.
async fn heartbeat_handler(State(state): State<AppState>) -> StatusCode {
    if health::deep_health(&state).await {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Contents of the version descriptor file, or 500 when unreadable.
async fn version_handler(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.config.version_file).await {
        Ok(raw) => match serde_json::from_slice::<serde_json::Value>(&raw) {
            Ok(version) => Json(version).into_response(),
            Err(_) => internal_error("version descriptor is not valid JSON"),
        },
        Err(_) => internal_error("version descriptor unavailable"),
    }
}

/// The recognition endpoint: any POST path carries an audio body.
async fn recognize_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let meta = meta_from_headers(&headers);
    match pipeline::run(&state, &request_id, meta, body).await {
        Ok(transcript) => Json(transcript.into_value()).into_response(),
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                kind = e.error_kind(),
                error = %e,
                "request.error"
            );
            error_response(&e)
        }
    }
}

/// Recognized metadata headers, lossily decoded so the validator can
/// judge (and reject) any byte sequence a client sends.
fn meta_from_headers(headers: &HeaderMap) -> RequestMeta {
    let get = |name: &str| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    };
    RequestMeta {
        language: get("accept-language"),
        store_sample: get("store-sample"),
        store_transcription: get("store-transcription"),
        user_agent: get("user-agent"),
        product_tag: get("product-tag"),
    }
}

fn error_response(err: &PipelineError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = if status == StatusCode::BAD_REQUEST {
        serde_json::json!({"message": err.client_message()})
    } else {
        serde_json::json!({"error": err.client_message()})
    };
    (status, Json(body)).into_response()
}

fn internal_error(detail: &str) -> Response {
    tracing::warn!(detail, "internal error response");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal STT Server Error"})),
    )
        .into_response()
}
