use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::support::spawn_app;

#[tokio::test]
async fn health_check_reports_current_time() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/health_check").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.get("currentTime").is_some());
    assert_eq!(json["sessionDirWritable"], true);
}
