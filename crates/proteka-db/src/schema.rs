//! Relational schema.
//!
//! All statements are `IF NOT EXISTS` so `init_schema` can run on every
//! startup and on every `--init-db` invocation.

use proteka_common::Result;
use sqlx::PgPool;
use tracing::info;

pub const TABLE_PROTEINS: &str = "proteins";
pub const TABLE_LIGANDS: &str = "ligands";
pub const TABLE_CATEGORIES: &str = "categories";
pub const TABLE_PROTEIN_CATEGORY: &str = "protein_category";
pub const TABLE_INTEGRITY: &str = "integrity_records";
pub const TABLE_DOCKING: &str = "docking_results";

const CREATE_PROTEINS: &str = r#"
CREATE TABLE IF NOT EXISTS proteins (
    id              SERIAL PRIMARY KEY,
    pdb_id          TEXT NOT NULL UNIQUE,
    title           TEXT,
    description     TEXT,
    resolution      DOUBLE PRECISION,
    deposition_date DATE,
    experiment_type TEXT,
    status          TEXT NOT NULL DEFAULT 'pending',
    quality         TEXT NOT NULL DEFAULT 'unknown_quality',
    num_chains      INTEGER NOT NULL DEFAULT 0,
    chain_data      JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ
)
"#;

const CREATE_LIGANDS: &str = r#"
CREATE TABLE IF NOT EXISTS ligands (
    id               SERIAL PRIMARY KEY,
    protein_id       INTEGER NOT NULL REFERENCES proteins(id) ON DELETE CASCADE,
    residue_name     TEXT NOT NULL,
    chain_id         TEXT NOT NULL,
    residue_seq      TEXT NOT NULL,
    num_atoms        INTEGER NOT NULL,
    center_x         DOUBLE PRECISION NOT NULL,
    center_y         DOUBLE PRECISION NOT NULL,
    center_z         DOUBLE PRECISION NOT NULL,
    smiles           TEXT,
    inchi_key        TEXT,
    molecular_weight DOUBLE PRECISION,
    logp             DOUBLE PRECISION,
    h_donors         INTEGER,
    h_acceptors      INTEGER,
    rotatable_bonds  INTEGER,
    tpsa             DOUBLE PRECISION,
    qed              DOUBLE PRECISION,
    binding_site     JSONB,
    binding_metrics  JSONB,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at       TIMESTAMPTZ
)
"#;

const CREATE_CATEGORIES: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id          SERIAL PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_PROTEIN_CATEGORY: &str = r#"
CREATE TABLE IF NOT EXISTS protein_category (
    protein_id  INTEGER NOT NULL REFERENCES proteins(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    PRIMARY KEY (protein_id, category_id)
)
"#;

const CREATE_INTEGRITY: &str = r#"
CREATE TABLE IF NOT EXISTS integrity_records (
    id           SERIAL PRIMARY KEY,
    data_type    TEXT NOT NULL,
    pdb_id       TEXT NOT NULL,
    sha256       TEXT NOT NULL,
    ipfs_hash    TEXT,
    chain_tx     TEXT,
    chain_status TEXT NOT NULL DEFAULT 'pending',
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (data_type, pdb_id)
)
"#;

const CREATE_DOCKING: &str = r#"
CREATE TABLE IF NOT EXISTS docking_results (
    id               SERIAL PRIMARY KEY,
    protein_id       INTEGER NOT NULL REFERENCES proteins(id) ON DELETE CASCADE,
    ligand_id        INTEGER NOT NULL REFERENCES ligands(id) ON DELETE CASCADE,
    program          TEXT NOT NULL,
    binding_affinity DOUBLE PRECISION NOT NULL,
    rmsd             DOUBLE PRECISION,
    poses            INTEGER,
    parameters       JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_ligands_protein ON ligands(protein_id)",
    "CREATE INDEX IF NOT EXISTS idx_protein_category_category ON protein_category(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_docking_protein ON docking_results(protein_id)",
];

/// Create all tables and indexes.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    for stmt in [
        CREATE_PROTEINS,
        CREATE_LIGANDS,
        CREATE_CATEGORIES,
        CREATE_PROTEIN_CATEGORY,
        CREATE_INTEGRITY,
        CREATE_DOCKING,
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }

    for stmt in CREATE_INDEXES {
        sqlx::query(stmt).execute(pool).await?;
    }

    info!("Database schema initialized");
    Ok(())
}
