//! HTTP ingress: `POST /log`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{with_timeout, LogRepository};
use crate::payload::Payload;

#[derive(Clone)]
struct AppState {
    repository: Arc<dyn LogRepository>,
    timeout: Duration,
}

/// Build the logging service's HTTP router.
pub fn router(repository: Arc<dyn LogRepository>, timeout: Duration) -> Router {
    Router::new()
        .route("/log", post(write_log))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            repository,
            timeout,
        })
}

/// Persist a payload; answers 202 once it is stored.
async fn write_log(State(state): State<AppState>, Json(payload): Json<Payload>) -> StatusCode {
    let name = payload.name.clone();

    match with_timeout(state.timeout, state.repository.insert(payload)).await {
        Ok(entry) => {
            info!(id = %entry.id, name = %name, "Log entry written");
            StatusCode::ACCEPTED
        }
        Err(e) => {
            error!(name = %name, error = %e, "Failed to write log entry");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}
