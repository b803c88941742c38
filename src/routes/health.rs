use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::config::StoreBackend;
use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.config.store_backend {
        StoreBackend::Memory => "memory",
        StoreBackend::Postgres => "postgres",
    };
    let body = json!({
        "status": "ok",
        "store": store,
        "generator": state.generator_enabled,
    });
    (StatusCode::OK, Json(body))
}
