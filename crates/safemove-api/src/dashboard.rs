use axum::{Json, extract::State};

use safemove_types::models::DashboardStats;

use crate::error::{ApiResult, blocking};
use crate::state::AppState;

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let db = state.db.clone();
    Ok(Json(blocking(move || db.dashboard_stats()).await?))
}
