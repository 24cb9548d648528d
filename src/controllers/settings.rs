use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::settings::AppSettings;

pub async fn show(State(ctx): State<AppContext>) -> Result<Json<AppSettings>, AppError> {
    Ok(Json(ctx.settings_store().load().await?))
}

pub async fn update(
    State(ctx): State<AppContext>,
    Json(settings): Json<AppSettings>,
) -> Result<Json<AppSettings>, AppError> {
    ctx.settings_store().save(&settings).await?;
    ctx.reset_pipeline().await;
    Ok(Json(settings))
}
