//! Row types and insert parameter types.
//!
//! These are the canonical JSON shapes of the API: a protein always carries
//! `experiment_type`, `status`, and `quality` (nullable where unknown), so
//! every page and endpoint serializes the same way.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProteinRow {
    pub id: i32,
    pub pdb_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub resolution: Option<f64>,
    pub deposition_date: Option<NaiveDate>,
    pub experiment_type: Option<String>,
    pub status: String,
    pub quality: String,
    pub num_chains: i32,
    pub chain_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Protein plus its category set, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProteinDetail {
    #[serde(flatten)]
    pub protein: ProteinRow,
    pub categories: Vec<CategoryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LigandRow {
    pub id: i32,
    pub protein_id: i32,
    pub residue_name: String,
    pub chain_id: String,
    pub residue_seq: String,
    pub num_atoms: i32,
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub smiles: Option<String>,
    pub inchi_key: Option<String>,
    pub molecular_weight: Option<f64>,
    pub logp: Option<f64>,
    pub h_donors: Option<i32>,
    pub h_acceptors: Option<i32>,
    pub rotatable_bonds: Option<i32>,
    pub tpsa: Option<f64>,
    pub qed: Option<f64>,
    pub binding_site: Option<serde_json::Value>,
    pub binding_metrics: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub protein_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IntegrityRow {
    pub id: i32,
    pub data_type: String,
    pub pdb_id: String,
    pub sha256: String,
    pub ipfs_hash: Option<String>,
    pub chain_tx: Option<String>,
    pub chain_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DockingRow {
    pub id: i32,
    pub protein_id: i32,
    pub ligand_id: i32,
    pub program: String,
    pub binding_affinity: f64,
    pub rmsd: Option<f64>,
    pub poses: Option<i32>,
    pub parameters: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub protein_count: i64,
    pub ligand_count: i64,
    pub category_count: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

// ── Insert parameters ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct NewProtein {
    pub pdb_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub resolution: Option<f64>,
    pub deposition_date: Option<NaiveDate>,
    pub experiment_type: Option<String>,
    pub status: String,
    pub quality: String,
    pub num_chains: i32,
    pub chain_data: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct NewLigand {
    pub residue_name: String,
    pub chain_id: String,
    pub residue_seq: String,
    pub num_atoms: i32,
    pub center: [f64; 3],
    pub smiles: Option<String>,
    pub inchi_key: Option<String>,
    pub molecular_weight: Option<f64>,
    pub logp: Option<f64>,
    pub h_donors: Option<i32>,
    pub h_acceptors: Option<i32>,
    pub rotatable_bonds: Option<i32>,
    pub tpsa: Option<f64>,
    pub qed: Option<f64>,
    pub binding_site: Option<serde_json::Value>,
    pub binding_metrics: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewDockingResult {
    pub protein_id: i32,
    pub ligand_id: i32,
    pub program: String,
    pub binding_affinity: f64,
    pub rmsd: Option<f64>,
    pub poses: Option<i32>,
    pub parameters: serde_json::Value,
}

/// Result of a protein upsert.
#[derive(Debug)]
pub struct ProteinUpsertResult {
    pub protein_id: i32,
    pub was_new: bool,
}
