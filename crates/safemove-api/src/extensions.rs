use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use safemove_types::api::{ExtensionRequestList, ReviewExtensionRequest, SubmitExtensionRequest};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn submit_extension(
    State(state): State<AppState>,
    Json(req): Json<SubmitExtensionRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .coordinator
        .request_extension(req.student_id, req.extend_minutes, req.personal_message)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Pending requests, first come first served.
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<ExtensionRequestList>> {
    let requests = state.coordinator.pending_extensions().await?;
    Ok(Json(ExtensionRequestList { requests }))
}

pub async fn review_extension(
    State(state): State<AppState>,
    Json(req): Json<ReviewExtensionRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = state.coordinator.review_extension(req.request_id, req.action).await?;
    Ok(Json(review))
}
