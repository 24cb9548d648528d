use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::holding::ScrapeOptions;
use crate::models::session::Session;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionPayload {
    #[serde(default)]
    cache: Option<HashMap<String, bool>>,
    #[serde(default)]
    use_cache: Option<bool>,
    #[serde(default)]
    min_percent: Option<f64>,
    #[serde(default)]
    cache_token: Option<String>,
    #[serde(default)]
    max_entries: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseStepPayload {
    #[serde(default)]
    cache: Option<HashMap<String, bool>>,
    #[serde(default)]
    use_cache: Option<bool>,
    #[serde(default)]
    common_stock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStepPayload {
    #[serde(default)]
    use_cache: Option<bool>,
    #[serde(default)]
    common_stock: Option<bool>,
}

pub async fn get_latest(State(ctx): State<AppContext>) -> Result<Json<Session>, AppError> {
    ctx.latest_session()
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("No Dataroma screener session found. Start a new session."))
}

pub async fn create(
    State(ctx): State<AppContext>,
    Json(payload): Json<StartSessionPayload>,
) -> Result<(axum::http::StatusCode, Json<Session>), AppError> {
    let use_cache = payload
        .use_cache
        .or_else(|| payload.cache.as_ref().and_then(|c| c.get("dataromaScrape").copied()))
        .unwrap_or(true);

    let opts = ScrapeOptions {
        use_cache,
        cache_token: payload.cache_token,
        min_percent: payload.min_percent,
        max_entries: payload.max_entries,
    };

    let pipeline = ctx.pipeline().await?;
    let session = pipeline.start_session(opts).await?;
    ctx.set_latest_session(session.clone()).await;

    Ok((axum::http::StatusCode::CREATED, Json(session)))
}

pub async fn get_by_id(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    let pipeline = ctx.pipeline().await?;
    pipeline
        .get_session(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Session"))
}

pub async fn run_universe_step(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(payload): Json<UniverseStepPayload>,
) -> Result<Json<Session>, AppError> {
    let use_cache = payload
        .use_cache
        .or_else(|| payload.cache.as_ref().and_then(|c| c.get("stockUniverse").copied()))
        .unwrap_or(true);

    let pipeline = ctx.pipeline().await?;
    let session = pipeline
        .run_universe_step(&id, use_cache, payload.common_stock.unwrap_or(false))
        .await?;
    ctx.set_latest_session(session.clone()).await;
    Ok(Json(session))
}

pub async fn run_match_step(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(payload): Json<MatchStepPayload>,
) -> Result<Json<Session>, AppError> {
    let pipeline = ctx.pipeline().await?;
    let session = pipeline
        .run_match_step(&id, payload.use_cache.unwrap_or(true), payload.common_stock.unwrap_or(false))
        .await?;
    ctx.set_latest_session(session.clone()).await;
    Ok(Json(session))
}
