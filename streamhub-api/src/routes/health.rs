/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "storage": "postgres" }
/// ```
///
/// `status` is `degraded` when the database does not answer.

use crate::{
    app::{AppState, StorageBackend},
    error::ApiResult,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use streamhub_shared::db::pool;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,

    /// `postgres`, `postgres-unreachable` or `memory`
    pub storage: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (healthy, storage) = match &state.storage {
        StorageBackend::Postgres(db) => match pool::health_check(db).await {
            Ok(()) => (true, "postgres"),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                (false, "postgres-unreachable")
            }
        },
        StorageBackend::Memory => (true, "memory"),
    };

    Ok(Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: streamhub_shared::VERSION.to_string(),
        storage: storage.to_string(),
    }))
}
