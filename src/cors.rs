use axum::http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::settings;

pub fn cors_layer() -> CorsLayer {
    let configured_origins = settings().application.cors.allowed_origins();

    CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_origin(allowed_origins(configured_origins))
}

fn allowed_origins(configured_origins: &[String]) -> AllowOrigin {
    if configured_origins == ["*"] {
        AllowOrigin::any()
    } else {
        let origins: Vec<_> = configured_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    }
}
