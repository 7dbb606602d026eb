use axum::{Json, extract::State};

use safemove_types::api::{SendAlertRequest, SendAlertResponse};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn send_whatsapp(
    State(state): State<AppState>,
    Json(req): Json<SendAlertRequest>,
) -> ApiResult<Json<SendAlertResponse>> {
    let notification = state.coordinator.send_alert(&req.phone_numbers, &req.message).await?;
    Ok(Json(SendAlertResponse { notification }))
}
