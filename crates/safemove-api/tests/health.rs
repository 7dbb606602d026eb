//! Health, routing, and the read-only student and dashboard views.

mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json};
use serde_json::json;

#[tokio::test]
async fn health_reports_store_status() {
    let app = TestApp::new();
    let resp = app.get("/health").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-request-id").is_some());
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = TestApp::new();
    assert_eq!(app.get("/nope").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_requires_name_and_phone() {
    let app = TestApp::new();

    let resp = app.post("/students", json!({ "name": "", "phone": "+911" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "VALIDATION_ERROR");

    let resp = app
        .post("/students", json!({ "name": "Asha", "phone": "+911", "image": "/a.png" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "inside");
    assert_eq!(json["image"], "/a.png");
}

#[tokio::test]
async fn find_students_by_name_and_status() {
    let app = TestApp::new();
    let asha = app.student("Asha", "+911").await;
    app.student("Ravi", "+912").await;
    app.post("/trips", json!({ "student_ids": [asha], "duration_minutes": 20 })).await;

    let json = body_json(app.get("/students?name=av").await).await;
    let names: Vec<&str> = json["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ravi"]);

    let json = body_json(app.get("/students?status_not=inside").await).await;
    assert_eq!(json["students"].as_array().unwrap().len(), 1);
    assert_eq!(json["students"][0]["id"], asha);

    assert_eq!(app.get("/students?status_not=away").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_counts() {
    let app = TestApp::new();
    let a = app.student("Asha", "+911").await;
    app.student("Ravi", "+912").await;
    app.student("Meera", "+913").await;
    app.post("/trips", json!({ "student_ids": [a], "duration_minutes": 20 })).await;
    app.post("/emergencies", json!({ "student_id": a, "cause": "Call Police" })).await;

    let json = body_json(app.get("/dashboard").await).await;
    assert_eq!(json["students_in"], 2);
    assert_eq!(json["students_out"], 1);
    assert_eq!(json["total_trips"], 1);
    assert_eq!(json["emergency_count"], 1);
}
