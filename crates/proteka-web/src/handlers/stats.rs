//! Archive statistics.

use axum::{extract::State, response::IntoResponse, Json};
use proteka_common::error::ApiError;

use crate::state::SharedState;

/// GET /api/stats - Protein/ligand/category counts and last update time
pub async fn api_stats(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.repo.stats().await?;
    Ok(Json(stats))
}
