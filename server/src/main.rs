use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tictactoe::{best_move, Engine, Marker, MoveRequest, Outcome, Rates, Scoreboard, DEFAULT_DEPTH};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct Config {
    addr: SocketAddr,
    depth: u8,
    stats_path: PathBuf,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let addr = env_or("TICTACTOE_ADDR", "0.0.0.0:3000").parse()?;
        let depth = match std::env::var("TICTACTOE_DEPTH") {
            Ok(raw) => raw.parse()?,
            Err(_) => DEFAULT_DEPTH,
        };
        Engine::new(Marker::X).with_depth(depth)?;
        let stats_path = env_or("TICTACTOE_STATS", "tictactoe-stats.json").into();
        Ok(Self {
            addr,
            depth,
            stats_path,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

struct AppState {
    depth: u8,
    stats_path: Option<PathBuf>,
    scoreboard: Mutex<Scoreboard>,
}

impl AppState {
    async fn load(config: &Config) -> Self {
        let scoreboard = match tokio::fs::read(&config.stats_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(path = %config.stats_path.display(), %err, "ignoring unreadable stats file");
                Scoreboard::default()
            }),
            Err(_) => Scoreboard::default(),
        };
        Self {
            depth: config.depth,
            stats_path: Some(config.stats_path.clone()),
            scoreboard: Mutex::new(scoreboard),
        }
    }

    async fn persist(&self, scoreboard: &Scoreboard) -> anyhow::Result<()> {
        if let Some(path) = &self.stats_path {
            tokio::fs::write(path, serde_json::to_vec_pretty(scoreboard)?).await?;
            info!(path = %path.display(), games = scoreboard.games(), "saved stats");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    let state = Arc::new(AppState::load(&config).await);
    let app = app_router(state);

    let listener = TcpListener::bind(config.addr).await?;
    info!(depth = config.depth, "Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/move", get(handle_move))
        .route(
            "/stats",
            get(get_stats).post(record_outcome).delete(clear_stats),
        );
    Router::new()
        .nest("/api", api)
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                ])
                .allow_origin(axum::http::HeaderValue::from_static("*"))
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct MoveQuery {
    board: String,
    human: Marker,
    level: Option<u8>,
}

async fn handle_move(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let req = MoveRequest {
        board: query.board,
        human: query.human,
        level: query.level.unwrap_or(state.depth),
    };
    let mv = best_move(req)?;
    let headers = [(header::CACHE_CONTROL, "no-store")];
    Ok((headers, Json(mv)))
}

#[derive(Debug, Serialize, Deserialize)]
struct StatsResponse {
    #[serde(flatten)]
    scoreboard: Scoreboard,
    games: u32,
    rates: Rates,
}

impl From<Scoreboard> for StatsResponse {
    fn from(scoreboard: Scoreboard) -> Self {
        Self {
            games: scoreboard.games(),
            rates: scoreboard.rates(),
            scoreboard,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutcomeBody {
    outcome: Outcome,
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let scoreboard = *state.scoreboard.lock().await;
    Json(scoreboard.into())
}

async fn record_outcome(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OutcomeBody>,
) -> Result<Json<StatsResponse>, ApiError> {
    let mut scoreboard = state.scoreboard.lock().await;
    scoreboard.record(body.outcome);
    info!("YOU {}", body.outcome.past_tense());
    state.persist(&scoreboard).await?;
    Ok(Json((*scoreboard).into()))
}

async fn clear_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let mut scoreboard = state.scoreboard.lock().await;
    scoreboard.clear();
    state.persist(&scoreboard).await?;
    Ok(Json((*scoreboard).into()))
}

#[derive(Debug)]
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = format!("{}", self.0);
        (status, body).into_response()
    }
}
