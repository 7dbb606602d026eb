#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use safemove_api::router::build_router;
use safemove_api::state::AppStateInner;
use safemove_db::Database;
use safemove_lifecycle::Coordinator;
use safemove_lifecycle::clock::ManualClock;
use safemove_lifecycle::notify::{NotificationContacts, Notifier, NotifyError};

/// Records every message instead of sending it. Fails on demand.
#[derive(Default)]
pub struct StubNotifier {
    pub sent: Mutex<Vec<(Vec<String>, String)>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Unavailable("stub outage".into()));
        }
        self.sent.lock().unwrap().push((recipients.to_vec(), body.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<StubNotifier>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notifier(StubNotifier::default())
    }

    pub fn with_notifier(notifier: StubNotifier) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("api.db"), 2).unwrap());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        let notifier = Arc::new(notifier);
        let contacts = NotificationContacts {
            emergency: vec!["+910000000100".into()],
            wardens: vec!["+910000000200".into()],
        };
        let coordinator = Coordinator::new(db, notifier.clone(), clock.clone(), contacts);
        let router = build_router(AppStateInner::new(coordinator), Duration::from_secs(30));

        Self {
            router,
            clock,
            notifier,
            _dir: dir,
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register a student and return its id.
    pub async fn student(&self, name: &str, phone: &str) -> i64 {
        let resp = self
            .post("/students", serde_json::json!({ "name": name, "phone": phone }))
            .await;
        assert_eq!(resp.status(), 201);
        body_json(resp).await["id"].as_i64().unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
