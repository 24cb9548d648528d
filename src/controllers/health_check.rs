use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    current_time: DateTime<Utc>,
    session_dir_writable: bool,
}

pub async fn show(State(ctx): State<AppContext>) -> Json<HealthCheck> {
    Json(HealthCheck {
        current_time: Utc::now(),
        session_dir_writable: probe_session_dir(&ctx).await,
    })
}

async fn probe_session_dir(ctx: &AppContext) -> bool {
    let probe = ctx.session_store().load("__health_check_probe__").await;
    probe.is_ok()
}
