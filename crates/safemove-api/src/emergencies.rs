use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use safemove_types::api::{EmergencyList, RecordEmergencyRequest};

use crate::error::{ApiResult, blocking};
use crate::state::AppState;

pub async fn record_emergency(
    State(state): State<AppState>,
    Json(req): Json<RecordEmergencyRequest>,
) -> ApiResult<impl IntoResponse> {
    let recorded = state.coordinator.record_emergency(req.student_id, &req.cause).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn list_emergencies(State(state): State<AppState>) -> ApiResult<Json<EmergencyList>> {
    let db = state.db.clone();
    let emergencies = blocking(move || db.list_emergencies()).await?;
    Ok(Json(EmergencyList { emergencies }))
}
