use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::support::spawn_app;

#[tokio::test]
async fn update_match_without_a_session_is_not_found() {
    let app = spawn_app();

    let payload = serde_json::json!({ "dataromaSymbol": "AAPL", "notAvailable": true });
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/dataroma-screener/matches")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_requires_two_characters() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/dataroma-screener/universe/search?query=a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn latest_session_is_not_found_before_any_session_starts() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/dataroma-screener/session/latest")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
