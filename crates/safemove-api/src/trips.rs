use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use safemove_types::api::{StartTripRequest, TimerList, TripHistory};
use safemove_types::models::MAX_TRIP_DURATION_SECS;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn start_trip(
    State(state): State<AppState>,
    Json(req): Json<StartTripRequest>,
) -> ApiResult<impl IntoResponse> {
    let max_minutes = MAX_TRIP_DURATION_SECS / 60;
    if req.duration_minutes <= 0 || req.duration_minutes > max_minutes {
        return Err(ApiError::BadRequest(format!(
            "duration_minutes must be between 1 and {}",
            max_minutes
        )));
    }
    let duration_secs = req.duration_minutes * 60;

    let started = state.coordinator.start_trip(&req.student_ids, duration_secs).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

pub async fn trip_history(State(state): State<AppState>) -> ApiResult<Json<TripHistory>> {
    let trips = state.coordinator.trip_history().await?;
    Ok(Json(TripHistory { trips }))
}

/// Every running countdown. Also settles expired trips as overdue.
pub async fn active_timers(State(state): State<AppState>) -> ApiResult<Json<TimerList>> {
    let timers = state.coordinator.poll_timers().await?;
    Ok(Json(TimerList { timers }))
}

pub async fn active_trip(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.active_trip(student_id).await?))
}

pub async fn close_trip(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.coordinator.close_trip(student_id).await?))
}
