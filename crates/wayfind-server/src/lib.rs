//! Wayfind server library logic.

pub mod api;
pub mod api_ws;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Extension, Json, Router,
};
use config::{Config, WebSocketConfig};
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use wayfind_intent::{build_classifier, IntentResolver, PlaceholderTranscriber, Transcriber};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Intent resolution over the configured classifier.
    pub resolver: Arc<IntentResolver>,
    /// Speech-to-text for the voice socket.
    pub transcriber: Arc<dyn Transcriber>,
    /// Registry of open voice sessions.
    pub connection_manager: api_ws::ConnectionManager,
    /// Keepalive and frame-size settings for the voice socket.
    pub websocket: WebSocketConfig,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Builds state from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let classifier = build_classifier(&config.classifier);
        let resolver = IntentResolver::new(classifier).with_timeout(config.classifier.timeout());

        tracing::info!(
            classifier = resolver.classifier_name(),
            model = %config.classifier.model,
            "intent classifier ready"
        );

        let transcriber = PlaceholderTranscriber;
        tracing::warn!(
            transcriber = transcriber.name(),
            "speech-to-text is not wired in; voice payloads are replaced by a fixed transcript"
        );

        Self {
            resolver: Arc::new(resolver),
            transcriber: Arc::new(transcriber),
            connection_manager: api_ws::ConnectionManager::new(),
            websocket: config.websocket.clone(),
            cors_origins: config.cors.allowed_origins.clone(),
        }
    }
}

/// Maximum request body size (1 MiB) for HTTP routes.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the CORS layer for the configured origins.
///
/// Credentials are allowed, so methods and headers mirror the request
/// instead of using a wildcard.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/api/intent", post(api::intent_handler))
        .route("/api/intents", get(api::list_intents_handler))
        .route("/ws/voice", get(api_ws::voice_ws_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(Arc::new(state)))
}

/// Binds `host:port`, falling back to an OS-assigned port when the requested
/// one is taken and `fallback` is set.
///
/// # Errors
///
/// Returns the bind error if the port is unavailable and fallback is off, or
/// if the fallback bind also fails.
pub async fn bind_listener(host: IpAddr, port: u16, fallback: bool) -> std::io::Result<TcpListener> {
    match TcpListener::bind(SocketAddr::new(host, port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if fallback && e.kind() == std::io::ErrorKind::AddrInUse => {
            let listener = TcpListener::bind(SocketAddr::new(host, 0)).await?;
            tracing::warn!(
                requested = port,
                assigned = listener.local_addr()?.port(),
                "port in use, using an OS-assigned port instead"
            );
            Ok(listener)
        }
        Err(e) => Err(e),
    }
}
