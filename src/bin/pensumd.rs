//! pensumd — the pensum daemon.
//!
//! Single authority over one obligation collection; the `pensum` CLI and the
//! web UI both talk to this HTTP API:
//!
//! - `GET    /health` — server status
//! - `GET    /info` — tracker statistics
//! - `GET    /obligations` — list all (post-sweep)
//! - `POST   /obligations` — add a structured draft
//! - `PATCH  /obligations/{id}` — partial update
//! - `POST   /obligations/{id}/toggle` — toggle done/pending
//! - `DELETE /obligations/{id}` — delete one
//! - `DELETE /obligations` — delete all
//! - `GET    /horizon` — the five display buckets
//! - `POST   /capture` — free text through the extraction path
//! - `POST   /clarify` — resolve a clarification follow-up
//!
//! Build and run: `cargo run --features server --bin pensumd`

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, FixedOffset, Local};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use pensum::client::{remove_pid_file, write_pid_file};
use pensum::config::Config;
use pensum::error::{PensumError, StoreError};
use pensum::extract::{Extractor, HttpExtractor, PhraseExtractor};
use pensum::obligation::{ObligationDraft, ObligationId, UpdatePatch};
use pensum::paths::PensumPaths;
use pensum::tracker::{Tracker, TrackerConfig};

// ── Server state ──────────────────────────────────────────────────────────

/// All mutations and post-sweep reads go through one lock, so the sweep and
/// the snapshot it produces are atomic (single-writer semantics).
struct ServerState {
    tracker: Mutex<Tracker>,
    extractor: Box<dyn Extractor + Send + Sync>,
}

type SharedState = Arc<ServerState>;

fn now_local() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

// ── Error mapping ─────────────────────────────────────────────────────────

/// Map a tracker error onto the HTTP surface: missing ids are 404 with the id
/// in the body, validation is 422, persistence failure is 500.
fn error_response(err: PensumError) -> Response {
    match &err {
        PensumError::Store(StoreError::NotFound { id }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not found", "id": id })),
        )
            .into_response(),
        PensumError::Store(StoreError::EmptyTitle)
        | PensumError::Store(StoreError::InvalidDuration { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
        PensumError::Extract(_) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
        _ => {
            tracing::error!(error = %err, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

fn ok_or_error<T: Serialize>(result: std::result::Result<T, PensumError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => error_response(err),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "name": "pensumd" }))
}

async fn info(State(state): State<SharedState>) -> Response {
    let tracker = state.tracker.lock().await;
    Json(tracker.info()).into_response()
}

async fn list_obligations(State(state): State<SharedState>) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.list_all(now_local()))
}

async fn add_obligation(
    State(state): State<SharedState>,
    Json(draft): Json<ObligationDraft>,
) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.add(draft, now_local()))
}

async fn update_obligation(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(patch): Json<UpdatePatch>,
) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.update(ObligationId::new(id), patch, now_local()))
}

async fn toggle_obligation(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.toggle_done(ObligationId::new(id)))
}

async fn delete_obligation(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.delete(ObligationId::new(id)))
}

async fn clear_obligations(State(state): State<SharedState>) -> Response {
    let mut tracker = state.tracker.lock().await;
    match tracker.clear_all() {
        Ok(removed) => Json(serde_json::json!({ "removed": removed })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn horizon(State(state): State<SharedState>) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.horizon(now_local()))
}

#[derive(Deserialize)]
struct CaptureRequest {
    text: String,
}

async fn capture(
    State(state): State<SharedState>,
    Json(request): Json<CaptureRequest>,
) -> Response {
    let now = now_local();
    // Extraction happens outside the lock; only the commit needs it.
    let extraction = match state.extractor.extract(&request.text, now) {
        Ok(extraction) => extraction,
        Err(err) => return error_response(err.into()),
    };
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.capture(extraction, now))
}

#[derive(Deserialize)]
struct ClarifyRequest {
    draft: ObligationDraft,
    phrase: String,
}

async fn clarify(
    State(state): State<SharedState>,
    Json(request): Json<ClarifyRequest>,
) -> Response {
    let mut tracker = state.tracker.lock().await;
    ok_or_error(tracker.clarify(request.draft, &request.phrase, now_local()))
}

// ── Entry point ───────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pensumd", version, about = "Pensum obligation daemon")]
struct Args {
    /// Interface to bind (overrides config).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Obligation collection file (overrides config and XDG default).
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Keep the collection in memory only (nothing touches disk).
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let paths = PensumPaths::resolve().into_diagnostic()?;
    paths.ensure_dirs().into_diagnostic()?;
    let config = Config::load(&paths.global_config_file()).into_diagnostic()?;

    let data_path = if args.ephemeral {
        None
    } else {
        Some(
            args.data_file
                .or_else(|| config.data_file.clone())
                .unwrap_or_else(|| paths.obligations_file()),
        )
    };
    let tracker = Tracker::new(TrackerConfig { data_path }).into_diagnostic()?;

    let extractor: Box<dyn Extractor + Send + Sync> = match &config.extractor_endpoint {
        Some(endpoint) => Box::new(HttpExtractor::new(endpoint.clone())),
        None => Box::new(PhraseExtractor::new()),
    };

    let state: SharedState = Arc::new(ServerState {
        tracker: Mutex::new(tracker),
        extractor,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route(
            "/obligations",
            get(list_obligations)
                .post(add_obligation)
                .delete(clear_obligations),
        )
        .route(
            "/obligations/{id}",
            patch(update_obligation).delete(delete_obligation),
        )
        .route("/obligations/{id}/toggle", post(toggle_obligation))
        .route("/horizon", get(horizon))
        .route("/capture", post(capture))
        .route("/clarify", post(clarify))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind = args.bind.unwrap_or(config.server.bind);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{bind}:{port}");

    write_pid_file(&paths, port, &bind).into_diagnostic()?;
    tracing::info!(%addr, "pensumd listening");

    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    let served = axum::serve(listener, app).await.into_diagnostic();

    remove_pid_file(&paths);
    served
}
