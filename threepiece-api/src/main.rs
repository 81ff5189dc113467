//! Three-piece tic-tac-toe Web API
//!
//! Serves a single shared `GameSession` over HTTP for a browser front end.
//! When a human move hands the turn to the AI, a tokio task sleeps for the
//! configured delay and then redeems the session's AI ticket. A reset or AI
//! toggle in the meantime turns that task into a no-op.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use threepiece_core::{AiTicket, GameSession, Pos, Scoreboard, SessionConfig, SessionEvent, Snapshot};

// =============================================================================
// Configuration
// =============================================================================

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "threepiece-api", about = "Web API for three-piece tic-tac-toe")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Delay before the AI plays its move, in milliseconds
    #[arg(long, default_value_t = 500)]
    ai_delay_ms: u64,

    /// Seed for the AI's random choices (defaults to the current time)
    #[arg(long)]
    seed: Option<u64>,

    /// Start with the AI opponent enabled
    #[arg(long)]
    ai: bool,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        let seed = self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        SessionConfig {
            ai_enabled: self.ai,
            ai_delay: Duration::from_millis(self.ai_delay_ms),
            seed,
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Shared application state
struct AppStateInner {
    session: Mutex<GameSession>,
}

impl AppStateInner {
    fn new(config: SessionConfig) -> Self {
        AppStateInner {
            session: Mutex::new(GameSession::new(config)),
        }
    }

    /// Lock the session. A panic while holding the lock cannot leave the
    /// session half-updated, so a poisoned lock is still usable.
    fn session(&self) -> MutexGuard<'_, GameSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type AppState = Arc<AppStateInner>;

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct GameStateModel {
    #[serde(flatten)]
    snapshot: Snapshot,
    /// Events since the previous response
    events: Vec<SessionEvent>,
}

#[derive(Deserialize)]
struct AiModeRequest {
    enabled: bool,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Serialize)]
struct ErrorModel {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorModel>);

fn error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(ErrorModel { detail: detail.into() }))
}

fn state_model(session: &mut GameSession) -> GameStateModel {
    GameStateModel {
        snapshot: session.snapshot(),
        events: session.drain_events(),
    }
}

// =============================================================================
// AI Scheduling
// =============================================================================

/// Play the AI move for `ticket` after `delay`.
fn schedule_ai_move(state: AppState, ticket: AiTicket, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut session = state.session();
        match session.run_ai_move(ticket) {
            Some(report) => debug!(cell = report.placed.0, status = ?report.status, "AI moved"),
            None => debug!(ticket = ticket.0, "AI move dropped"),
        }
    });
}

// =============================================================================
// Handlers
// =============================================================================

async fn get_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session();
    Json(state_model(&mut session))
}

async fn activate_cell(
    State(state): State<AppState>,
    Path(index): Path<u8>,
) -> Result<Json<GameStateModel>, ApiError> {
    let pos = Pos::new(index)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, format!("Cell index {} out of range", index)))?;

    let mut session = state.session();
    let turn = session
        .on_cell_activated(pos)
        .ok_or_else(|| error(StatusCode::CONFLICT, format!("Move to cell {} not accepted", index)))?;

    if let Some(ticket) = turn.ai_ticket {
        schedule_ai_move(state.clone(), ticket, session.ai_delay());
    }
    Ok(Json(state_model(&mut session)))
}

async fn reset_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session();
    session.reset();
    Json(state_model(&mut session))
}

async fn set_ai_mode(
    State(state): State<AppState>,
    Json(req): Json<AiModeRequest>,
) -> Json<GameStateModel> {
    let mut session = state.session();
    session.set_ai_enabled(req.enabled);
    Json(state_model(&mut session))
}

async fn get_scores(State(state): State<AppState>) -> Json<Scoreboard> {
    Json(state.session().scores())
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/game", get(get_game))
        .route("/cell/{index}", post(activate_cell))
        .route("/reset", post(reset_game))
        .route("/ai", post(set_ai_mode))
        .route("/scores", get(get_scores))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.session_config();
    info!(
        ai = config.ai_enabled,
        delay_ms = args.ai_delay_ms,
        seed = config.seed,
        "session configured"
    );

    let state: AppState = Arc::new(AppStateInner::new(config));

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("Three-piece API running on http://{}", args.bind);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
