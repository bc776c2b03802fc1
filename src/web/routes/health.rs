use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::web::{AppState, dto::health::HealthResponse};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    description = "Reachability of the key-value store and the database. Progress tracking degrades rather than fails, so this is always 200",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    ),
    tag = "health"
)]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (cache, database) = tokio::join!(
        state.tracker().ping(),
        state.pool().database().is_alive()
    );

    let status = if cache && database { "ok" } else { "degraded" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            cache,
            database,
        }),
    )
}
