use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use safemove_types::api::{RegisterStudentRequest, StudentList, StudentQuery};

use crate::error::{ApiError, ApiResult, blocking};
use crate::state::AppState;

pub async fn register_student(
    State(state): State<AppState>,
    Json(req): Json<RegisterStudentRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim().to_string();
    let phone = req.phone.trim().to_string();
    if name.is_empty() || phone.is_empty() {
        return Err(ApiError::BadRequest("name and phone are required".into()));
    }
    let image = req.image.filter(|i| !i.trim().is_empty());

    let db = state.db.clone();
    let student = blocking(move || db.create_student(&name, &phone, image.as_deref())).await?;
    info!(student_id = student.id, "Student registered");

    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn find_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> ApiResult<Json<StudentList>> {
    let db = state.db.clone();
    let students = blocking(move || db.find_students(&query.name, query.status_not)).await?;
    Ok(Json(StudentList { students }))
}

pub async fn student_timer(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let reading = state.coordinator.student_timer(student_id).await?;
    Ok(Json(reading))
}
