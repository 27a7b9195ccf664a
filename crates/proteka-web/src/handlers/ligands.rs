//! Ligand lookup.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use proteka_common::error::ApiError;
use proteka_db::models::LigandRow;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct LigandResponse {
    pub ligand: LigandRow,
}

/// GET /api/ligands/:id
pub async fn api_ligand(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: i32 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("ligand id must be numeric, got {:?}", id)))?;

    let ligand = state
        .repo
        .get_ligand(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("ligand {} not found", id)))?;

    Ok(Json(LigandResponse { ligand }))
}
