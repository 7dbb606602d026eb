use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use safemove_lifecycle::LifecycleError;

/// Error type for HTTP handlers. Every failure becomes a JSON body of the
/// form `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Lifecycle(err) => match err {
                LifecycleError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                LifecycleError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                LifecycleError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                LifecycleError::Store(e) => internal(e),
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::Internal(e) => internal(e),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal(err: &anyhow::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("store task failed: {}", e))
        })?
        .map_err(ApiError::from)
}
