use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::support::spawn_app;

#[tokio::test]
async fn get_settings_returns_defaults_before_any_write() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/api/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["preferences"]["defaultProvider"], "eodhd");
    assert_eq!(json["providerKeys"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn put_settings_round_trips_a_provider_key() {
    let app = spawn_app();

    let payload = serde_json::json!({
        "providerKeys": [{"provider": "eodhd", "apiKey": "secret-token", "updatedAt": "2026-01-01T00:00:00Z"}],
        "preferences": {
            "defaultProvider": "eodhd",
            "cache": {"dataromaScrape": true, "stockUniverse": false}
        }
    });

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/settings")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .oneshot(Request::builder().uri("/api/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["providerKeys"][0]["apiKey"], "secret-token");
    assert_eq!(json["preferences"]["cache"]["stockUniverse"], false);
}
