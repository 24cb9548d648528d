use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::symbol::SymbolRecord;

const MAX_RESULTS: usize = 15;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    results: Vec<SymbolRecord>,
}

pub async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let trimmed = params.query.trim();
    if trimmed.chars().count() < 2 {
        return Err(AppError::input("Search query must be at least 2 characters long."));
    }

    let session = ctx
        .latest_session()
        .await
        .ok_or_else(|| AppError::not_found("No stock universe available. Run the screener first."))?;

    let universe = session
        .provider_universe
        .ok_or_else(|| AppError::not_found("No stock universe available. Run the screener first."))?;

    let normalized_query = trimmed.to_lowercase();
    let mut matches: Vec<SymbolRecord> = universe
        .symbols
        .values()
        .flat_map(|payload| payload.payload.clone())
        .filter(|s| s.name.to_lowercase().contains(&normalized_query))
        .collect();

    matches.sort_by(|a, b| a.name.cmp(&b.name));
    matches.truncate(MAX_RESULTS);

    Ok(Json(SearchResponse { results: matches }))
}
