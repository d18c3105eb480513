//! HTTP API tests driven through the router without a listener.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use stream_anomaly::config::ServiceConfig;
use stream_anomaly::service::{build_router, InitResponse, ServiceState};
use stream_anomaly::ScoreResult;
use tower::ServiceExt;

fn app() -> Router {
    build_router(ServiceState::new(&ServiceConfig::default()))
}

async fn post(app: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn init(app: &Router, min: f64, max: f64, period: usize) -> (StatusCode, Value) {
    let body = json!({ "inputMin": min, "inputMax": max, "probationaryPeriod": period });
    post(app, "/api/init", body.to_string()).await
}

async fn record(app: &Router, timestamp: f64, value: f64) -> (StatusCode, Value) {
    let body = json!({ "timestamp": timestamp, "value": value });
    post(app, "/api/handleRecord", body.to_string()).await
}

#[tokio::test]
async fn health_reports_detector_state() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["detectorActive"], false);

    init(&app, 0.0, 100.0, 100).await;
    let (_, body) = get(&app, "/health").await;
    assert_eq!(body["detectorActive"], true);
}

#[tokio::test]
async fn init_then_score_records() {
    let app = app();
    let (status, body) = init(&app, 0.0, 100.0, 100).await;
    assert_eq!(status, StatusCode::OK);
    let init: InitResponse = serde_json::from_value(body).unwrap();
    assert_eq!(init.status, "OK");

    for i in 0..20 {
        let (status, body) = record(&app, 1_700_000_000.0 + 60.0 * i as f64, i as f64).await;
        assert_eq!(status, StatusCode::OK);
        let score: ScoreResult = serde_json::from_value(body).unwrap();
        assert!((0.0..=1.0).contains(&score.raw_score));
        assert!((0.0..=1.0).contains(&score.anomaly_score));
    }
}

#[tokio::test]
async fn record_before_init_conflicts() {
    let app = app();
    let (status, body) = record(&app, 1_700_000_000.0, 1.0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("/api/init"));

    let (status, _) = get(&app, "/api/modelParams").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_init_is_bad_request_and_keeps_previous_detector() {
    let app = app();
    let (_, first) = init(&app, 0.0, 100.0, 100).await;

    let (status, body) = init(&app, 5.0, 5.0, 100).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = init(&app, 0.0, 100.0, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, params) = get(&app, "/api/modelParams").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(params["detectorId"], first["detectorId"]);
}

#[tokio::test]
async fn malformed_bodies_are_bad_request() {
    let app = app();
    let (status, body) = post(&app, "/api/init", "{ nope".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = post(&app, "/api/init", json!({ "inputMin": 0 }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    init(&app, 0.0, 100.0, 10).await;
    let (status, _) = post(&app, "/api/handleRecord", json!({ "value": 1 }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = record(&app, 1e300, 1.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reinit_replaces_active_detector() {
    let app = app();
    let (_, first) = init(&app, 0.0, 100.0, 100).await;
    record(&app, 1_700_000_000.0, 1.0).await;
    let (_, second) = init(&app, 0.0, 10.0, 50).await;
    assert_ne!(first["detectorId"], second["detectorId"]);

    let (status, params) = get(&app, "/api/modelParams").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(params["detectorId"], second["detectorId"]);
    // 0..10 padded by 2 on each side, 130 buckets
    let resolution = params["sensorParams"]["resolution"].as_f64().unwrap();
    assert!((resolution - 14.0 / 130.0).abs() < 1e-12);
    assert_eq!(params["likelihood"]["learningPeriod"], 25);
}

#[tokio::test]
async fn model_params_use_record_field_names() {
    let app = app();
    init(&app, 0.0, 100.0, 100).await;
    let (status, params) = get(&app, "/api/modelParams").await;
    assert_eq!(status, StatusCode::OK);
    let encoders = &params["modelParams"]["modelParams"]["sensorParams"]["encoders"];
    assert_eq!(encoders["value"]["name"], "value");
    assert_eq!(encoders["timestamp_timeOfDay"]["name"], "timestamp");
    assert!(encoders.get("c1").is_none());
    assert_eq!(params["sensorParams"]["fieldname"], "value");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reinit_while_scoring_swaps_detector_cleanly() {
    let app = app();
    let (_, first) = init(&app, 0.0, 100.0, 100).await;

    let mut scoring = Vec::new();
    for i in 0..32 {
        let app = app.clone();
        scoring.push(tokio::spawn(async move {
            record(&app, 1_700_000_000.0 + 60.0 * i as f64, i as f64).await
        }));
    }
    let replacement = {
        let app = app.clone();
        tokio::spawn(async move { init(&app, 0.0, 10.0, 50).await })
    };
    for i in 32..64 {
        let app = app.clone();
        scoring.push(tokio::spawn(async move {
            record(&app, 1_700_000_000.0 + 60.0 * i as f64, (i % 10) as f64).await
        }));
    }

    let (status, second) = replacement.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["detectorId"], second["detectorId"]);
    for task in scoring {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{}", body);
        let score: ScoreResult = serde_json::from_value(body).unwrap();
        assert!((0.0..=1.0).contains(&score.raw_score));
    }

    let (status, params) = get(&app, "/api/modelParams").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(params["detectorId"], second["detectorId"]);
    assert_eq!(params["likelihood"]["learningPeriod"], 25);
}
