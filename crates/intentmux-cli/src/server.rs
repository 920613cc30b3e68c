//! HTTP boundary: `/predict`, `/chat` and `/health` over one shared [`Engine`].
//!
//! Input validation happens here; the engine only ever sees non-blank text.
//! Each resolution runs on the blocking pool under a per-request deadline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use intentmux_ai::{Engine, LoadReport};
use intentmux_core::text::is_blank;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ServerError, ServerResult};

pub const NO_TEXT: &str = "No text provided";
pub const EMPTY_MESSAGE: &str = "Message cannot be empty.";

pub struct AppState {
    engine: Arc<Engine>,
    timeout: Duration,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Engine, timeout: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            timeout,
            started_at: Utc::now(),
        }
    }

    /// Run `f` against the engine on the blocking pool, bounded by the deadline.
    ///
    /// A timed-out task is not cancelled; it finishes in the background.
    async fn run<T, F>(&self, f: F) -> ServerResult<T>
    where
        F: FnOnce(&Engine) -> T + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || f(&engine));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ServerError::Internal(e.to_string())),
            Err(_) => Err(ServerError::Timeout(self.timeout.as_millis())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub intent: String,
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub lexical: bool,
    pub responses: usize,
    pub artifacts: LoadReport,
}

/// Pull non-blank text out of a JSON body, or reject with `message`.
fn require_text(
    body: Result<Json<Option<String>>, JsonRejection>,
    message: &str,
) -> ServerResult<String> {
    match body {
        Ok(Json(Some(text))) if !is_blank(&text) => Ok(text),
        _ => Err(ServerError::BadRequest(message.to_string())),
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ServerResult<Json<PredictResponse>> {
    let text = require_text(body.map(|Json(b)| Json(b.text)), NO_TEXT)?;
    let resolution = state.run(move |engine| engine.resolve(&text)).await?;
    Ok(Json(PredictResponse {
        intent: resolution.intent,
        confidence: resolution.confidence,
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ServerResult<Json<ChatResponse>> {
    let message = require_text(body.map(|Json(b)| Json(b.message)), EMPTY_MESSAGE)?;
    let (resolution, reply) = state.run(move |engine| engine.chat(&message)).await?;
    info!(
        intent = %resolution.intent,
        confidence = resolution.confidence,
        reply = reply.kind(),
        "chat reply"
    );
    Ok(Json(ChatResponse {
        response: reply.text(),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let report = state.engine.report().clone();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        lexical: report.lexical_enabled(),
        responses: state.engine.responder().len(),
        artifacts: report,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn serve(engine: Engine, addr: SocketAddr, timeout: Duration) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(engine, timeout));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, timeout_ms = timeout.as_millis() as u64, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
