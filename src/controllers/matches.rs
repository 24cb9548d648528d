use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::matches::MatchCandidate;
use crate::models::symbol::SymbolRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatchPayload {
    dataroma_symbol: String,
    #[serde(default)]
    provider_symbol: Option<SymbolRecord>,
    #[serde(default)]
    not_available: Option<bool>,
}

pub async fn update(
    State(ctx): State<AppContext>,
    Json(payload): Json<UpdateMatchPayload>,
) -> Result<Json<MatchCandidate>, AppError> {
    let mut session = ctx
        .latest_session()
        .await
        .filter(|s| s.matches.is_some())
        .ok_or_else(|| AppError::not_found("No match suggestions available. Run the screener."))?;

    let matches = session.matches.as_mut().expect("checked above");
    let entry = matches
        .iter_mut()
        .find(|m| m.dataroma_symbol == payload.dataroma_symbol)
        .ok_or_else(|| AppError::not_found("Match candidate not found"))?;

    if payload.not_available.unwrap_or(false) {
        entry.confirm(None);
    } else if let Some(symbol) = payload.provider_symbol {
        entry.confirm(Some(symbol));
    } else {
        return Err(AppError::input(
            "Provide a symbol or mark the candidate as not available.",
        ));
    }

    let updated = entry.clone();

    ctx.session_store().save(&session).await?;
    ctx.set_latest_session(session).await;

    Ok(Json(updated))
}
