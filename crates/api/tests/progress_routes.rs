use std::sync::Arc;

use api::{AppState, JwtAuthenticator, router};
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use progress_core::model::{Language, UserId};
use progress_core::time::fixed_clock;
use serde_json::{Value, json};
use services::{AppServices, PassthroughTranslator, TranslationError, Translator};
use tower::ServiceExt;

const SECRET: &[u8] = b"route-test-secret";

struct Tagging;

#[async_trait]
impl Translator for Tagging {
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        Ok(format!("{target}:{text}"))
    }
}

struct Harness {
    app: Router,
    auth: JwtAuthenticator,
}

impl Harness {
    fn new() -> Self {
        Self::with_translator(Arc::new(PassthroughTranslator))
    }

    fn with_translator(translator: Arc<dyn Translator>) -> Self {
        let services = AppServices::in_memory(fixed_clock(), translator);
        let auth = JwtAuthenticator::new(SECRET);
        let state = AppState::new(services.progress(), Arc::new(auth.clone()));
        Self {
            app: router(state),
            auth,
        }
    }

    fn token(&self, user: &str) -> String {
        self.auth
            .issue(&UserId::new(user), Duration::minutes(10))
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn create(&self, user: &str, body: Value) -> Value {
        let (status, value) = self.send(Method::POST, "/progress/", Some(user), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{value}");
        value["progress"].clone()
    }
}

#[tokio::test]
async fn create_returns_record_with_empty_metadata() {
    let h = Harness::new();
    let (status, body) = h
        .send(
            Method::POST,
            "/progress/",
            Some("student-1"),
            Some(json!({"status": "incomplete", "activity_type": "view", "course_id": "c1"})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Progress logged successfully");
    assert_eq!(body["progress"]["status"], "incomplete");
    assert_eq!(body["progress"]["activity_type"], "view");
    assert_eq!(body["progress"]["course_id"], "c1");
    assert_eq!(body["progress"]["metadata"], json!({}));
    assert!(body["progress"]["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body["progress"]["timestamp"].is_string());
}

#[tokio::test]
async fn create_rejects_missing_and_mistyped_fields() {
    let h = Harness::new();

    let (status, body) = h
        .send(
            Method::POST,
            "/progress/",
            Some("student-1"),
            Some(json!({"activity_type": "view"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("status"));

    let (status, _) = h
        .send(
            Method::POST,
            "/progress/",
            Some("student-1"),
            Some(json!({"status": "incomplete", "activity_type": "view", "score": "high"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = h
        .send(Method::POST, "/progress/", Some("student-1"), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn requests_without_valid_token_are_unauthorized() {
    let h = Harness::new();

    let (status, body) = h.send(Method::GET, "/progress/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");

    let request = Request::builder()
        .uri("/progress/")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn unsupported_language_is_rejected_with_lowercased_code() {
    let h = Harness::new();
    h.create("student-1", json!({"status": "incomplete", "activity_type": "view"}))
        .await;

    let (status, body) = h
        .send(
            Method::GET,
            "/progress/?target_language=XX",
            Some("student-1"),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("xx"), "{detail}");
    assert!(!detail.contains("XX"), "{detail}");
}

#[tokio::test]
async fn malformed_query_string_is_reported_as_detail() {
    let h = Harness::new();
    h.create("student-1", json!({"status": "incomplete", "activity_type": "view"}))
        .await;

    let (status, body) = h
        .send(
            Method::GET,
            "/progress/?target_language=fr&target_language=de",
            Some("student-1"),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("target_language"), "{detail}");
}

#[tokio::test]
async fn language_codes_are_case_insensitive() {
    let h = Harness::new();
    h.create("student-1", json!({"status": "incomplete", "activity_type": "view"}))
        .await;

    for uri in ["/progress/?target_language=FR", "/progress/?target_language=fr"] {
        let (status, body) = h.send(Method::GET, uri, Some("student-1"), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["message"], "Progress records fetched successfully");
        assert_eq!(body["progress"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn empty_listing_is_not_found() {
    let h = Harness::new();
    h.create("someone-else", json!({"status": "incomplete", "activity_type": "view"}))
        .await;

    let (status, body) = h
        .send(Method::GET, "/progress", Some("student-1"), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No progress records found");
}

#[tokio::test]
async fn listing_localizes_metadata_strings() {
    let h = Harness::with_translator(Arc::new(Tagging));
    h.create(
        "student-1",
        json!({
            "status": "incomplete",
            "activity_type": "quiz_attempt",
            "quiz_id": "q1",
            "metadata": {"title": "Fractions", "attempt": 2}
        }),
    )
    .await;

    let (status, body) = h
        .send(
            Method::GET,
            "/progress/?target_language=fr",
            Some("student-1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let record = &body["progress"][0];
    assert_eq!(record["metadata"], json!({"title": "fr:Fractions", "attempt": 2}));
    assert_eq!(record["status"], "incomplete");
    assert_eq!(record["quiz_id"], "q1");

    let (_, body) = h.send(Method::GET, "/progress/", Some("student-1"), None).await;
    assert_eq!(body["progress"][0]["metadata"]["title"], "Fractions");
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let h = Harness::new();
    let created = h
        .create(
            "student-1",
            json!({
                "status": "incomplete",
                "activity_type": "view",
                "course_id": "c1",
                "score": 10.0,
                "metadata": {"page": 3}
            }),
        )
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = h
        .send(
            Method::PUT,
            &format!("/progress/{id}"),
            Some("student-1"),
            Some(json!({"status": "complete"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Progress updated successfully");
    let updated = &body["progress"];
    assert_eq!(updated["status"], "complete");
    for key in ["id", "course_id", "activity_type", "score", "metadata", "timestamp"] {
        assert_eq!(updated[key], created[key], "{key} changed");
    }
}

#[tokio::test]
async fn repeated_update_is_idempotent() {
    let h = Harness::new();
    let created = h
        .create("student-1", json!({"status": "incomplete", "activity_type": "view"}))
        .await;
    let uri = format!("/progress/{}", created["id"].as_str().unwrap());
    let update = json!({"status": "complete", "score": 80.0, "metadata": {"note": "done"}});

    let (first_status, first) = h
        .send(Method::PUT, &uri, Some("student-1"), Some(update.clone()))
        .await;
    let (second_status, second) = h
        .send(Method::PUT, &uri, Some("student-1"), Some(update))
        .await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["progress"], second["progress"]);
}

#[tokio::test]
async fn empty_update_is_not_found_and_changes_nothing() {
    let h = Harness::new();
    let created = h
        .create("student-1", json!({"status": "incomplete", "activity_type": "view"}))
        .await;
    let uri = format!("/progress/{}", created["id"].as_str().unwrap());

    let (status, body) = h
        .send(Method::PUT, &uri, Some("student-1"), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Progress record not found or not updated");

    let (_, listed) = h.send(Method::GET, "/progress/", Some("student-1"), None).await;
    assert_eq!(listed["progress"][0], created);
}

#[tokio::test]
async fn foreign_and_unknown_records_are_not_found() {
    let h = Harness::new();
    let created = h
        .create("owner", json!({"status": "incomplete", "activity_type": "view"}))
        .await;
    let uri = format!("/progress/{}", created["id"].as_str().unwrap());

    let (status, _) = h
        .send(
            Method::PUT,
            &uri,
            Some("intruder"),
            Some(json!({"status": "complete"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .send(
            Method::PUT,
            "/progress/does-not-exist",
            Some("owner"),
            Some(json!({"status": "complete"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = h.send(Method::GET, "/progress/", Some("owner"), None).await;
    assert_eq!(listed["progress"][0]["status"], "incomplete");
}

#[tokio::test]
async fn null_status_in_update_is_unprocessable() {
    let h = Harness::new();
    let created = h
        .create("student-1", json!({"status": "incomplete", "activity_type": "view"}))
        .await;
    let uri = format!("/progress/{}", created["id"].as_str().unwrap());

    let (status, _) = h
        .send(Method::PUT, &uri, Some("student-1"), Some(json!({"status": null})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_needs_no_token() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}
