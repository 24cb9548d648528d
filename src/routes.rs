use axum::routing::{get, post, put};
use axum::Router;

use crate::context::AppContext;
use crate::controllers;

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/health_check", get(controllers::health_check::show))
        .route(
            "/api/dataroma-screener/session/latest",
            get(controllers::sessions::get_latest),
        )
        .route(
            "/api/dataroma-screener/session",
            post(controllers::sessions::create),
        )
        .route(
            "/api/dataroma-screener/session/:id",
            get(controllers::sessions::get_by_id),
        )
        .route(
            "/api/dataroma-screener/session/:id/universe",
            post(controllers::sessions::run_universe_step),
        )
        .route(
            "/api/dataroma-screener/session/:id/matches",
            post(controllers::sessions::run_match_step),
        )
        .route(
            "/api/dataroma-screener/universe/search",
            get(controllers::universe::search),
        )
        .route(
            "/api/dataroma-screener/matches",
            put(controllers::matches::update),
        )
        .route(
            "/api/settings",
            get(controllers::settings::show).put(controllers::settings::update),
        )
        .with_state(ctx)
}
