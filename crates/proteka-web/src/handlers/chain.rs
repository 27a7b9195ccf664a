//! Publication and chain recording endpoints.
//!
//! `publish` pins the canonical protein document to IPFS and writes the
//! write-once integrity record; `record` forwards a content identifier to
//! the wallet agent and attaches the returned signature.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use proteka_common::error::ApiError;
use proteka_common::hashing::hash_json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::is_valid_accession;
use crate::state::SharedState;

const DOCUMENT_TYPE: &str = "protein_document";

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub hash: String,
    pub protein_id: String,
}

/// POST /api/proteins/:pdb_id/publish
pub async fn api_publish(
    State(state): State<SharedState>,
    Path(pdb_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_accession(&pdb_id) {
        return Err(ApiError::BadRequest(format!(
            "malformed accession: {}",
            pdb_id
        )));
    }

    let detail = state
        .repo
        .get_protein(&pdb_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("protein {} not found", pdb_id.to_uppercase())))?;
    let ligands = state.repo.ligands_for_protein(detail.protein.id).await?;
    let pdb_id = detail.protein.pdb_id.clone();

    let document = serde_json::json!({
        "protein": detail,
        "ligands": ligands,
    });
    let sha256 = hash_json(&document).map_err(ApiError::from)?;

    let hash = state.ipfs.upload_json(&document).await?;
    state
        .repo
        .record_integrity(DOCUMENT_TYPE, &pdb_id, &sha256, Some(&hash))
        .await?;

    info!("Published {} as {}", pdb_id, hash);
    Ok(Json(PublishResponse {
        hash,
        protein_id: pdb_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct IpfsHashResponse {
    pub ipfs_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/proteins/:pdb_id/ipfs
pub async fn api_get_ipfs(
    State(state): State<SharedState>,
    Path(pdb_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .repo
        .get_integrity(DOCUMENT_TYPE, &pdb_id)
        .await?
        .and_then(|r| r.ipfs_hash.map(|h| (h, r.created_at)))
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no published document for {}",
                pdb_id.to_uppercase()
            ))
        })?;

    Ok(Json(IpfsHashResponse {
        ipfs_hash: record.0,
        created_at: record.1,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub cid: String,
    /// When supplied, the resulting signature is attached to this
    /// protein's integrity record.
    pub pdb_id: Option<String>,
}

/// POST /api/chain/record
pub async fn api_record_cid(
    State(state): State<SharedState>,
    Json(request): Json<RecordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.recorder.record(&request.cid).await?;

    if let Some(pdb_id) = &request.pdb_id {
        state
            .repo
            .set_chain_tx(DOCUMENT_TYPE, pdb_id, &receipt.signature, "confirmed")
            .await?;
    }

    Ok(Json(receipt))
}
