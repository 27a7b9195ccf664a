//! Category listing.

use axum::{extract::State, response::IntoResponse, Json};
use proteka_common::error::ApiError;

use crate::state::SharedState;

/// GET /api/categories - All categories with per-category protein counts
pub async fn api_categories(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.repo.list_categories().await?;
    Ok(Json(categories))
}
