//! HTTP front end for a [`Gazetteer`].
//!
//! - `GET /location?location=<text>&records=<n>&mode=<curated|keyword>`
//! - `GET /search?query=<expr>&records=<n>&total=<bool>`
//! - `GET /health`
//!
//! Searches run on the blocking pool; the index is shared read-only.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    gazetteer::Gazetteer,
    error::{Result, ToponymError},
    search::{QueryPolicy, SearchOutcome},
};

/// Upper bound on `records` accepted from a request.
pub const MAX_RECORDS_PER_REQUEST: usize = 1000;

#[derive(Clone)]
pub struct AppState {
    gazetteer: Arc<Gazetteer>,
}

impl AppState {
    pub fn new(gazetteer: Gazetteer) -> Self {
        Self {
            gazetteer: Arc::new(gazetteer),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    pub location: String,
    pub records: Option<usize>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub records: Option<usize>,
    #[serde(default)]
    pub total: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub doc_count: u64,
}

#[derive(Serialize)]
struct ErrorJson {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Toponym(ToponymError),
}

impl From<ToponymError> for ApiError {
    fn from(err: ToponymError) -> Self {
        Self::Toponym(err)
    }
}

/// HTTP status for an engine error.
pub fn status_for(err: &ToponymError) -> StatusCode {
    match err {
        ToponymError::InvalidQueryExpression { .. } => StatusCode::BAD_REQUEST,
        ToponymError::IndexUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Toponym(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!(error = %err, "Request failed");
                } else {
                    warn!(error = %err, "Rejected request");
                }
                (status, err.to_string())
            }
        };
        (status, Json(ErrorJson { error: message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/location", get(location_handler))
        .route("/search", get(search_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `gazetteer` on `listen` until Ctrl-C.
pub async fn serve(gazetteer: Gazetteer, listen: SocketAddr) -> Result<()> {
    let app = router(AppState::new(gazetteer));
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "Starting gazetteer service");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

fn bounded_records(requested: Option<usize>, default: usize) -> usize {
    requested
        .unwrap_or(default)
        .clamp(1, MAX_RECORDS_PER_REQUEST)
}

async fn run_blocking<T, F>(state: &AppState, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Gazetteer) -> Result<T> + Send + 'static,
{
    let gazetteer = Arc::clone(&state.gazetteer);
    tokio::task::spawn_blocking(move || f(&gazetteer))
        .await
        .map_err(|e| ApiError::Toponym(ToponymError::Other(e.into())))?
        .map_err(ApiError::from)
}

pub(crate) async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, ApiError> {
    let doc_count = run_blocking(&state, Gazetteer::doc_count).await?;
    Ok(Json(HealthResponse {
        status: "ok",
        doc_count,
    }))
}

pub(crate) async fn location_handler(
    State(state): State<AppState>,
    Query(params): Query<LocationParams>,
) -> std::result::Result<Json<SearchOutcome>, ApiError> {
    let config = state.gazetteer.config();
    let policy = match params.mode.as_deref() {
        Some(mode) => mode.parse::<QueryPolicy>().map_err(ApiError::BadRequest)?,
        None => config.policy,
    };
    let max_records = bounded_records(params.records, config.max_records);
    let location = params.location;

    let outcome = run_blocking(&state, move |g| {
        g.search_location_with(&location, max_records, policy)
    })
    .await?;
    Ok(Json(outcome))
}

pub(crate) async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<SearchOutcome>, ApiError> {
    let config = state.gazetteer.config();
    let max_records = bounded_records(params.records, config.max_records);
    let want_total = params.total.unwrap_or(config.count_total);
    let query = params.query;

    let outcome = run_blocking(&state, move |g| {
        g.search_index(&query, max_records, want_total)
    })
    .await?;
    Ok(Json(outcome))
}
