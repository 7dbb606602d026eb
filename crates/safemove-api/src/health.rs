use axum::{Json, extract::State};

use safemove_types::api::HealthResponse;

use crate::error::{ApiResult, blocking};
use crate::state::AppState;

/// Always 200 while the process is serving; `db_healthy` carries the probe.
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let db = state.db.clone();
    let db_healthy = blocking(move || Ok(db.ping())).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        db_healthy,
    }))
}
