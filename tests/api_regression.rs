//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! every endpoint using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port. Datasets live in temp directories.

use spoilage_sense::api::{create_app, ServiceState};
use spoilage_sense::config::ServiceConfig;
use spoilage_sense::ml_engine::{ModelRegistry, Trainer};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

/// Three classes separable on MQ2A and MQ3A; MQ4A is class-independent
/// and has gaps.
fn write_dataset(dir: &Path) {
    let mut csv = String::from("MQ2A,MQ2D,MQ3A,MQ3D,MQ4A,MQ4D,output\n");
    for i in 0..60 {
        let class = i % 3;
        let mq4 = if i % 10 == 0 {
            String::new()
        } else {
            (200 + (i * 5) % 37).to_string()
        };
        csv.push_str(&format!(
            "{},{},{},0,{},1,{}\n",
            100 + 150 * class + (i * 7) % 20,
            class % 2,
            80 + 40 * class + (i * 3) % 15,
            mq4,
            class
        ));
    }
    std::fs::write(dir.join("food.csv"), csv).unwrap();
}

fn create_test_app(dir: &Path) -> (Router, Arc<ModelRegistry>) {
    let mut config = ServiceConfig::default();
    config.dataset.path = dir.join("food").display().to_string();
    config.forest.n_estimators = 15;

    let registry = Arc::new(ModelRegistry::new());
    let state = ServiceState::new(registry.clone(), Arc::new(Trainer::new(&config)));
    (create_app(state), registry)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// GET / returns the plain-text banner.
#[tokio::test]
async fn test_root_banner() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(dir.path());

    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Food Spoilage Detection");
}

/// Health is not-ready before training, ready after, and stays ready.
#[tokio::test]
async fn test_health_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let (app, _) = create_test_app(dir.path());

    for uri in ["/health", "/api/v1/health"] {
        let (status, v) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["ready"], false);
        assert_eq!(v["data"]["features"], json!([]));
    }

    let (status, _) = send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, v) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(v["data"]["ready"], true);
    assert_eq!(v["data"]["features"], json!(["MQ2A", "MQ3A", "MQ4A"]));
    assert_eq!(v["data"]["model_generation"], 1);

    let (status, _) = send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, again) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(again["data"]["ready"], true);
    assert_eq!(again["data"]["features"], v["data"]["features"]);
    assert_eq!(again["data"]["model_generation"], 2);
}

/// Retrain response carries metrics, classes, features and sample counts.
#[tokio::test]
async fn test_retrain_response_shape() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let (app, _) = create_test_app(dir.path());

    let (status, v) = send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &v["data"];
    assert_eq!(data["model_generation"], 1);
    assert_eq!(data["classes"], json!(["0", "1", "2"]));
    assert_eq!(data["features"], json!(["MQ2A", "MQ3A", "MQ4A"]));
    assert_eq!(data["samples"]["total"], 60);
    assert_eq!(data["samples"]["test"], 12);
    assert_eq!(data["samples"]["train"], 48);
    assert!(data["test_score"].as_f64().unwrap() > 0.8);
    assert!(data["noisy_score"].is_number());
    assert_eq!(data["per_class"].as_array().unwrap().len(), 3);
    assert_eq!(data["dataset"]["format"], "csv");
}

/// Classify before any train is NOT_READY, not a crash.
#[tokio::test]
async fn test_classify_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(dir.path());

    let (status, v) = send(&app, Method::POST, "/api/v1/classify", Some(r#"{"MQ2A": 100}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"]["code"], "NOT_READY");
}

/// Malformed JSON and non-object payloads are BAD_REQUEST.
#[tokio::test]
async fn test_classify_bad_payloads() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let (app, _) = create_test_app(dir.path());
    send(&app, Method::POST, "/api/v1/retrain", None).await;

    for body in ["{not json", "[1, 2, 3]", "42"] {
        let (status, v) = send(&app, Method::POST, "/api/v1/classify", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(v["error"]["code"], "BAD_REQUEST");
    }
}

/// Partial payloads classify with imputation and echo the key bookkeeping.
#[tokio::test]
async fn test_classify_partial_payload() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let (app, _) = create_test_app(dir.path());
    send(&app, Method::POST, "/api/v1/retrain", None).await;

    let (status, v) = send(
        &app,
        Method::POST,
        "/api/v1/classify",
        Some(r#"{"MQ2A": 405, "MQ3A": "165", "MQ2D": 1, "colour": "brown"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &v["data"];
    assert_eq!(data["label"], "2");
    assert_eq!(data["expected_features"], json!(["MQ2A", "MQ3A", "MQ4A"]));
    assert_eq!(data["received_features"], json!(["MQ2A", "MQ3A"]));
    assert_eq!(data["imputed_features"], json!(["MQ4A"]));
    assert_eq!(data["ignored_features"], json!(["MQ2D", "colour"]));
    assert!(data["probabilities"].is_null());
}

/// An empty object is valid: every feature falls back to its mean.
#[tokio::test]
async fn test_classify_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let (app, _) = create_test_app(dir.path());
    send(&app, Method::POST, "/api/v1/retrain", None).await;

    let (status, v) = send(&app, Method::POST, "/api/v1/classify", Some("{}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["imputed_features"], json!(["MQ2A", "MQ3A", "MQ4A"]));
}

/// Missing dataset: retrain fails with a message and readiness is unchanged.
#[tokio::test]
async fn test_retrain_missing_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let (app, registry) = create_test_app(dir.path());

    let (status, v) = send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"]["code"], "DATASET_NOT_FOUND");
    assert!(!v["error"]["message"].as_str().unwrap().is_empty());
    assert!(!registry.is_ready());

    write_dataset(dir.path());
    send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert!(registry.is_ready());

    std::fs::remove_file(dir.path().join("food.csv")).unwrap();
    let (status, _) = send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(registry.is_ready());
    assert_eq!(registry.generation(), 1);
}

/// A dataset without the target column is a SCHEMA_MISMATCH.
#[tokio::test]
async fn test_retrain_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("food.csv"), "MQ2A,MQ3A\n1,2\n3,4\n").unwrap();
    let (app, _) = create_test_app(dir.path());

    let (status, v) = send(&app, Method::POST, "/api/v1/retrain", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"]["code"], "SCHEMA_MISMATCH");
    assert!(v["error"]["message"].as_str().unwrap().contains("output"));
}

/// GET /api/v1/model returns the report and imputation means once trained.
#[tokio::test]
async fn test_model_summary() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let (app, _) = create_test_app(dir.path());

    let (status, v) = send(&app, Method::GET, "/api/v1/model", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["error"]["code"], "NOT_READY");

    send(&app, Method::POST, "/api/v1/retrain", None).await;
    let (status, v) = send(&app, Method::GET, "/api/v1/model", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &v["data"];
    assert_eq!(data["generation"], 1);
    assert_eq!(data["target"], "output");
    assert!(data["imputation_means"]["MQ4A"].is_number());
    assert_eq!(data["report"]["confusion_matrix"].as_array().unwrap().len(), 3);
}
