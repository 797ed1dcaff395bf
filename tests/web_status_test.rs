use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use metron::coordinator::MeterSnapshot;
use metron::web::{AppState, router};
use tokio::sync::watch;
use tower::ServiceExt;

fn snapshot() -> MeterSnapshot {
    MeterSnapshot {
        timestamp: Utc::now().to_rfc3339(),
        ean: "859182400100366666".to_string(),
        consumption: 12.5,
        production: 0.0,
        last_processed_date: NaiveDate::from_ymd_opt(2024, 3, 8),
    }
}

#[tokio::test]
async fn health_ok() {
    let (_tx, rx) = watch::channel(snapshot());
    let app = router(AppState { snapshot_rx: rx });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_returns_snapshot_json() {
    let (_tx, rx) = watch::channel(snapshot());
    let app = router(AppState { snapshot_rx: rx });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["consumption"].as_f64(), Some(12.5));
    assert_eq!(body["production"].as_f64(), Some(0.0));
    assert_eq!(body["ean"].as_str(), Some("859182400100366666"));
    assert_eq!(body["last_processed_date"].as_str(), Some("2024-03-08"));
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn status_tracks_published_updates() {
    let (tx, rx) = watch::channel(snapshot());
    let app = router(AppState { snapshot_rx: rx });

    let mut updated = snapshot();
    updated.consumption = 99.25;
    tx.send(updated).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["consumption"].as_f64(), Some(99.25));
}
