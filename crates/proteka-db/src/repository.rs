//! Repository over the relational schema.
//!
//! Handles:
//! - Protein upsert by accession
//! - Ligand replacement per protein (delete-then-insert, one transaction)
//! - Category assignment (get-or-create, reset association set)
//! - Listing with category filter + pagination
//! - Integrity records (write-once) and docking results

use crate::models::*;
use proteka_common::{ProtekaError, Result};
use sqlx::PgPool;
use tracing::debug;

/// Unique-constraint violation, per PostgreSQL error codes.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ── Protein operations ───────────────────────────────────────────────────

    /// Insert a protein, or update the existing row for the same accession.
    /// Returns the row id and whether it was newly inserted.
    pub async fn upsert_protein(&self, p: &NewProtein) -> Result<ProteinUpsertResult> {
        let pdb_id = p.pdb_id.to_uppercase();

        let inserted: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO proteins
                (pdb_id, title, description, resolution, deposition_date,
                 experiment_type, status, quality, num_chains, chain_data)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            ON CONFLICT (pdb_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&pdb_id)
        .bind(&p.title)
        .bind(&p.description)
        .bind(p.resolution)
        .bind(p.deposition_date)
        .bind(&p.experiment_type)
        .bind(&p.status)
        .bind(&p.quality)
        .bind(p.num_chains)
        .bind(&p.chain_data)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(ProteinUpsertResult {
                protein_id: id,
                was_new: true,
            });
        }

        // Accession already present: refresh the computed fields.
        let id: i32 = sqlx::query_scalar(
            r#"
            UPDATE proteins SET
                title = $2, description = $3, resolution = $4,
                deposition_date = $5, experiment_type = $6, status = $7,
                quality = $8, num_chains = $9, chain_data = $10,
                updated_at = now()
            WHERE pdb_id = $1
            RETURNING id
            "#,
        )
        .bind(&pdb_id)
        .bind(&p.title)
        .bind(&p.description)
        .bind(p.resolution)
        .bind(p.deposition_date)
        .bind(&p.experiment_type)
        .bind(&p.status)
        .bind(&p.quality)
        .bind(p.num_chains)
        .bind(&p.chain_data)
        .fetch_one(&self.pool)
        .await?;

        debug!(pdb_id = %pdb_id, "protein updated in place");
        Ok(ProteinUpsertResult {
            protein_id: id,
            was_new: false,
        })
    }

    /// List proteins with an optional category filter. `total` counts the
    /// filtered set without pagination.
    pub async fn list_proteins(
        &self,
        category: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ProteinRow>, i64)> {
        let (rows, total) = match category {
            Some(name) => {
                let rows = sqlx::query_as::<_, ProteinRow>(
                    r#"
                    SELECT p.* FROM proteins p
                    JOIN protein_category pc ON pc.protein_id = p.id
                    JOIN categories c ON c.id = pc.category_id
                    WHERE c.name = $1
                    ORDER BY p.pdb_id
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(name)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: i64 = sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM proteins p
                    JOIN protein_category pc ON pc.protein_id = p.id
                    JOIN categories c ON c.id = pc.category_id
                    WHERE c.name = $1
                    "#,
                )
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

                (rows, total)
            }
            None => {
                let rows = sqlx::query_as::<_, ProteinRow>(
                    "SELECT * FROM proteins ORDER BY pdb_id LIMIT $1 OFFSET $2",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proteins")
                    .fetch_one(&self.pool)
                    .await?;

                (rows, total)
            }
        };

        Ok((rows, total))
    }

    /// Fetch one protein by accession with its categories joined.
    pub async fn get_protein(&self, pdb_id: &str) -> Result<Option<ProteinDetail>> {
        let protein = sqlx::query_as::<_, ProteinRow>("SELECT * FROM proteins WHERE pdb_id = $1")
            .bind(pdb_id.to_uppercase())
            .fetch_optional(&self.pool)
            .await?;

        let Some(protein) = protein else {
            return Ok(None);
        };

        let categories = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT c.id, c.name, c.description FROM categories c
            JOIN protein_category pc ON pc.category_id = c.id
            WHERE pc.protein_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(protein.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProteinDetail {
            protein,
            categories,
        }))
    }

    // ── Ligand operations ────────────────────────────────────────────────────

    /// Replace all ligand rows for a protein in one transaction.
    /// Re-categorization re-imports, so stale rows must not survive.
    pub async fn replace_ligands(&self, protein_id: i32, ligands: &[NewLigand]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ligands WHERE protein_id = $1")
            .bind(protein_id)
            .execute(&mut *tx)
            .await?;

        let mut count = 0;
        for l in ligands {
            sqlx::query(
                r#"
                INSERT INTO ligands
                    (protein_id, residue_name, chain_id, residue_seq, num_atoms,
                     center_x, center_y, center_z, smiles, inchi_key,
                     molecular_weight, logp, h_donors, h_acceptors,
                     rotatable_bonds, tpsa, qed, binding_site, binding_metrics)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
                "#,
            )
            .bind(protein_id)
            .bind(&l.residue_name)
            .bind(&l.chain_id)
            .bind(&l.residue_seq)
            .bind(l.num_atoms)
            .bind(l.center[0])
            .bind(l.center[1])
            .bind(l.center[2])
            .bind(&l.smiles)
            .bind(&l.inchi_key)
            .bind(l.molecular_weight)
            .bind(l.logp)
            .bind(l.h_donors)
            .bind(l.h_acceptors)
            .bind(l.rotatable_bonds)
            .bind(l.tpsa)
            .bind(l.qed)
            .bind(&l.binding_site)
            .bind(&l.binding_metrics)
            .execute(&mut *tx)
            .await?;
            count += 1;
        }

        tx.commit().await?;
        debug!(protein_id, count, "ligands replaced");
        Ok(count)
    }

    pub async fn get_ligand(&self, id: i32) -> Result<Option<LigandRow>> {
        let row = sqlx::query_as::<_, LigandRow>("SELECT * FROM ligands WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn ligands_for_protein(&self, protein_id: i32) -> Result<Vec<LigandRow>> {
        let rows = sqlx::query_as::<_, LigandRow>(
            "SELECT * FROM ligands WHERE protein_id = $1 ORDER BY chain_id, residue_seq",
        )
        .bind(protein_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Category operations ──────────────────────────────────────────────────

    /// Reset a protein's category set to exactly `names`, creating category
    /// rows as needed.
    pub async fn assign_categories(&self, protein_id: i32, names: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM protein_category WHERE protein_id = $1")
            .bind(protein_id)
            .execute(&mut *tx)
            .await?;

        for name in names {
            let category_id: i32 = sqlx::query_scalar(
                r#"
                WITH ins AS (
                    INSERT INTO categories (name, description)
                    VALUES ($1, $2)
                    ON CONFLICT (name) DO NOTHING
                    RETURNING id
                )
                SELECT id FROM ins
                UNION ALL
                SELECT id FROM categories WHERE name = $1
                LIMIT 1
                "#,
            )
            .bind(name)
            .bind(format!("Protein family: {}", name))
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO protein_category (protein_id, category_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(protein_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>> {
        let rows = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.description,
                   COUNT(pc.protein_id) AS protein_count
            FROM categories c
            LEFT JOIN protein_category pc ON pc.category_id = c.id
            GROUP BY c.id, c.name, c.description
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Integrity records ────────────────────────────────────────────────────

    /// Write-once: a second record for the same (data_type, pdb_id) is a
    /// conflict surfaced to the caller.
    pub async fn record_integrity(
        &self,
        data_type: &str,
        pdb_id: &str,
        sha256: &str,
        ipfs_hash: Option<&str>,
    ) -> Result<i32> {
        let result: std::result::Result<i32, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO integrity_records (data_type, pdb_id, sha256, ipfs_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(data_type)
        .bind(pdb_id.to_uppercase())
        .bind(sha256)
        .bind(ipfs_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => Err(ProtekaError::Conflict(format!(
                "integrity record already exists for {} {}",
                data_type, pdb_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_integrity(&self, data_type: &str, pdb_id: &str) -> Result<Option<IntegrityRow>> {
        let row = sqlx::query_as::<_, IntegrityRow>(
            "SELECT * FROM integrity_records WHERE data_type = $1 AND pdb_id = $2",
        )
        .bind(data_type)
        .bind(pdb_id.to_uppercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Attach the chain transaction signature once the recorder confirms it.
    pub async fn set_chain_tx(
        &self,
        data_type: &str,
        pdb_id: &str,
        tx_signature: &str,
        status: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE integrity_records
            SET chain_tx = $3, chain_status = $4
            WHERE data_type = $1 AND pdb_id = $2
            "#,
        )
        .bind(data_type)
        .bind(pdb_id.to_uppercase())
        .bind(tx_signature)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Docking results ──────────────────────────────────────────────────────

    pub async fn insert_docking_result(&self, r: &NewDockingResult) -> Result<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO docking_results
                (protein_id, ligand_id, program, binding_affinity, rmsd, poses, parameters)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING id
            "#,
        )
        .bind(r.protein_id)
        .bind(r.ligand_id)
        .bind(&r.program)
        .bind(r.binding_affinity)
        .bind(r.rmsd)
        .bind(r.poses)
        .bind(&r.parameters)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn docking_results_for_protein(&self, protein_id: i32) -> Result<Vec<DockingRow>> {
        let rows = sqlx::query_as::<_, DockingRow>(
            "SELECT * FROM docking_results WHERE protein_id = $1 ORDER BY binding_affinity",
        )
        .bind(protein_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Stats ────────────────────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<StatsSummary> {
        let protein_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proteins")
            .fetch_one(&self.pool)
            .await?;
        let ligand_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ligands")
            .fetch_one(&self.pool)
            .await?;
        let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        let last_updated: Option<chrono::DateTime<chrono::Utc>> =
            sqlx::query_scalar("SELECT MAX(GREATEST(created_at, COALESCE(updated_at, created_at))) FROM proteins")
                .fetch_one(&self.pool)
                .await?;

        Ok(StatsSummary {
            protein_count,
            ligand_count,
            category_count,
            last_updated,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e.as_database_error().and_then(|d| d.code()),
        Some(code) if code == PG_UNIQUE_VIOLATION
    )
}
