//! Axum router — maps all URL paths to handlers.

use crate::handlers::{
    categories::api_categories,
    chain::{api_get_ipfs, api_publish, api_record_cid},
    dashboard::dashboard,
    ligands::api_ligand,
    proteins::{api_protein_detail, api_proteins, protein_detail_page, proteins_page},
    stats::api_stats,
};
use crate::state::{AppState, SharedState};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/", get(dashboard))
        .route("/proteins", get(proteins_page))
        .route("/proteins/{pdb_id}", get(protein_detail_page))

        // API endpoints
        .route("/api/proteins", get(api_proteins))
        .route("/api/proteins/{pdb_id}", get(api_protein_detail))
        .route("/api/proteins/{pdb_id}/publish", post(api_publish))
        .route("/api/proteins/{pdb_id}/ipfs", get(api_get_ipfs))
        .route("/api/ligands/{id}", get(api_ligand))
        .route("/api/categories", get(api_categories))
        .route("/api/stats", get(api_stats))
        .route("/api/chain/record", post(api_record_cid))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
