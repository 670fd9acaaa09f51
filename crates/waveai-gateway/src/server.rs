//! Gateway HTTP server — Axum-based JSON API in front of the fallback resolver

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use waveai_core::providers::types::OPENAI_BASE_URL;
use waveai_core::{FallbackResolver, HttpTransport, Persona, check_anthropic_key, check_openai_key};

use crate::protocol::{AgentInfo, ChatRequest, ChatResponse, ErrorBody, KeyTestRequest};

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub resolver: Arc<FallbackResolver>,
    /// Used by the key probe endpoint
    pub transport: Arc<dyn HttpTransport>,
    pub openai_base_url: String,
    pub start_time: std::time::Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(
        bind: SocketAddr,
        resolver: Arc<FallbackResolver>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let state = GatewayState {
            resolver,
            transport,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            start_time: std::time::Instant::now(),
        };
        Self { state, bind }
    }

    /// Point the OpenAI key probe somewhere other than the public API
    pub fn with_openai_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.state.openai_base_url = base_url.into();
        self
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat", post(chat_handler))
            .route("/api/test-keys", post(test_keys_handler))
            .route("/api/agents", get(agents_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);

        axum::serve(listener, router).await?;

        Ok(())
    }
}

fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

// ── HTTP Handlers ──

async fn chat_handler(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request = match ChatRequest::from_body(&body) {
        Ok(request) => request,
        Err(err) => {
            debug!("Rejected chat request: {}", err.message());
            let body = ErrorBody {
                error: err.message().to_string(),
            };
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }
    };

    let resolution = state
        .resolver
        .resolve(&request.message, request.agent.id(), &request.credentials)
        .await;
    info!(
        "Chat for {} answered by {} ({} attempts)",
        resolution.persona,
        resolution.provider_used,
        resolution.attempted.len()
    );

    axum::Json(ChatResponse::new(resolution, timestamp())).into_response()
}

async fn test_keys_handler(State(state): State<GatewayState>, body: Bytes) -> impl IntoResponse {
    let request = KeyTestRequest::from_body(&body);
    let mut results = Map::new();

    if let Some(key) = &request.openai_key {
        let check =
            check_openai_key(state.transport.as_ref(), &state.openai_base_url, key).await;
        results.insert("openai".into(), Value::Bool(check.ok));
        if let Some(error) = check.error {
            results.insert("openai_error".into(), Value::String(error));
        }
    }

    if let Some(key) = &request.anthropic_key {
        let check = check_anthropic_key(key);
        results.insert("anthropic".into(), Value::Bool(check.ok));
        if let Some(error) = check.error {
            results.insert("anthropic_error".into(), Value::String(error));
        }
    }

    axum::Json(Value::Object(results))
}

async fn agents_handler() -> impl IntoResponse {
    let agents: Vec<AgentInfo> = Persona::ALL.into_iter().map(AgentInfo::from).collect();
    axum::Json(serde_json::json!({ "agents": agents }))
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "timestamp": timestamp(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}
