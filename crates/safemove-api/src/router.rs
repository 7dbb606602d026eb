use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, StatusCode};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;
use crate::{alerts, dashboard, emergencies, extensions, health, students, trips};

/// The full application router. The server binary and the integration tests
/// both go through here so they see the same middleware.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(health::health))
        .route("/students", post(students::register_student).get(students::find_students))
        .route("/students/{id}/timer", get(students::student_timer))
        .route("/trips", post(trips::start_trip).get(trips::trip_history))
        .route("/trips/active", get(trips::active_timers))
        .route("/trips/active/{student_id}", get(trips::active_trip))
        .route("/trips/active/{student_id}/close", post(trips::close_trip))
        .route(
            "/extension-requests",
            post(extensions::submit_extension)
                .get(extensions::list_pending)
                .patch(extensions::review_extension),
        )
        .route(
            "/emergencies",
            post(emergencies::record_emergency).get(emergencies::list_emergencies),
        )
        .route("/alerts/whatsapp", post(alerts::send_whatsapp))
        .route("/dashboard", get(dashboard::dashboard))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
