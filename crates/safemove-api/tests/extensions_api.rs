mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json};
use serde_json::json;

async fn app_with_trip() -> (TestApp, i64) {
    let app = TestApp::new();
    let a = app.student("Asha", "+910000000001").await;
    let resp = app.post("/trips", json!({ "student_ids": [a], "duration_minutes": 40 })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    (app, a)
}

#[tokio::test]
async fn approve_extension_adds_time() {
    let (app, a) = app_with_trip().await;

    let resp = app
        .post(
            "/extension-requests",
            json!({ "student_id": a, "extend_minutes": 15, "personal_message": "bus is late" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let request_id = body_json(resp).await["id"].as_i64().unwrap();

    let json = body_json(app.get("/extension-requests").await).await;
    let pending = json["requests"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["student_name"], "Asha");
    assert_eq!(pending[0]["extend_minutes"], 15);
    assert_eq!(pending[0]["status"], "pending");

    let resp = app
        .patch("/extension-requests", json!({ "request_id": request_id, "action": "approve" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["request"]["status"], "approved");
    assert_eq!(json["trip"]["duration_secs"], 3300);
    assert!(json["warning"].is_null());

    let json = body_json(app.get(&format!("/students/{a}/timer")).await).await;
    assert_eq!(json["remaining_seconds"], 3300);

    let json = body_json(app.get("/extension-requests").await).await;
    assert!(json["requests"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn second_review_is_a_conflict() {
    let (app, a) = app_with_trip().await;
    let resp = app
        .post("/extension-requests", json!({ "student_id": a, "extend_minutes": 10 }))
        .await;
    let request_id = body_json(resp).await["id"].as_i64().unwrap();

    let approve = json!({ "request_id": request_id, "action": "approve" });
    assert_eq!(app.patch("/extension-requests", approve).await.status(), StatusCode::OK);

    let reject = json!({ "request_id": request_id, "action": "reject" });
    let resp = app.patch("/extension-requests", reject).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["code"], "CONFLICT");

    let json = body_json(app.get(&format!("/students/{a}/timer")).await).await;
    assert_eq!(json["remaining_seconds"], 2400 + 600);
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let app = TestApp::new();
    let resp = app
        .patch("/extension-requests", json!({ "request_id": 77, "action": "reject" }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn extension_without_trip_is_rejected() {
    let app = TestApp::new();
    let a = app.student("Asha", "+910000000001").await;

    let resp = app
        .post("/extension-requests", json!({ "student_id": a, "extend_minutes": 10 }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post("/extension-requests", json!({ "student_id": a, "extend_minutes": 10, "bogus": 1 }))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_extension_is_rejected() {
    let (app, a) = app_with_trip().await;

    for minutes in [12 * 60 + 1, i64::MAX / 2] {
        let resp = app
            .post("/extension-requests", json!({ "student_id": a, "extend_minutes": minutes }))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{minutes} minutes");
    }
    let json = body_json(app.get("/extension-requests").await).await;
    assert!(json["requests"].as_array().unwrap().is_empty());

    let b = app.student("Bela", "+910000000002").await;
    let resp = app.post("/trips", json!({ "student_ids": [b], "duration_minutes": 10 })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn stale_approval_carries_a_warning() {
    let (app, a) = app_with_trip().await;
    let resp = app
        .post("/extension-requests", json!({ "student_id": a, "extend_minutes": 10 }))
        .await;
    let request_id = body_json(resp).await["id"].as_i64().unwrap();
    app.post(&format!("/trips/active/{a}/close"), json!({})).await;

    let resp = app
        .patch("/extension-requests", json!({ "request_id": request_id, "action": "approve" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["request"]["status"], "approved");
    assert!(json["trip"].is_null());
    assert_eq!(json["warning"]["request_id"], request_id);
    assert_eq!(json["notification"]["status"], "skipped");
}
