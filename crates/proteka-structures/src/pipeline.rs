//! Batch phase orchestration.
//!
//! Each phase reads its input from the previous phase's file and writes its
//! own, so phases compose in one CLI invocation or run standalone:
//!   download  → data/raw/*.{pdb,cif} + processed/metadata.json
//!   process   → processed/structures.jsonl
//!   categorize→ processed/categorized.jsonl
//!   import-db → relational rows
//! One identifier's failure is logged and recorded; the batch continues.

use crate::categorize::{CategorizedStructure, Categorizer};
use crate::extract::{ProcessStatus, ProcessedStructure, StructureExtractor};
use crate::fetch::EntryMetadata;
use crate::properties::{LigandProperties, PropertyResolver};
use anyhow::{Context, Result};
use proteka_common::config::CategorizerRules;
use proteka_common::ProtekaError;
use proteka_db::models::{NewLigand, NewProtein};
use proteka_db::Repository;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of one processing phase run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    pub processed: usize,
    pub ligands_total: usize,
    pub failed: Vec<String>,
}

/// Summary of a database import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub updated: usize,
    pub failed: Vec<String>,
}

// ── Process phase ─────────────────────────────────────────────────────────────

/// Extract every file into a flat record and write one JSON line each.
pub fn run_processing(
    paths: &[PathBuf],
    rules: &CategorizerRules,
    out_file: &Path,
) -> Result<ProcessReport> {
    let extractor = StructureExtractor::new(rules);
    let mut report = ProcessReport::default();
    let mut records = Vec::with_capacity(paths.len());

    info!("Processing {} structure files", paths.len());

    for path in paths {
        let record = extractor.process_file(path);
        match record.status {
            ProcessStatus::Processed => {
                report.processed += 1;
                report.ligands_total += record.ligands.len();
            }
            ProcessStatus::Failed => report.failed.push(record.pdb_id.clone()),
        }
        records.push(record);
    }

    write_jsonl(out_file, &records)?;
    info!(
        "Processed {}/{} files, {} ligand candidates ({} failed)",
        report.processed,
        paths.len(),
        report.ligands_total,
        report.failed.len()
    );

    Ok(report)
}

pub fn load_processed(path: &Path) -> Result<Vec<ProcessedStructure>> {
    read_jsonl(path)
}

// ── Categorize phase ──────────────────────────────────────────────────────────

/// Categorize processed structures. The raw file is re-parsed per structure
/// for binding-site geometry; a missing or unreadable file downgrades to
/// metadata-only categorization. Ligand properties are resolved once per
/// distinct component id when a resolver is supplied.
pub async fn run_categorization(
    processed: &[ProcessedStructure],
    metadata: &BTreeMap<String, EntryMetadata>,
    rules: &CategorizerRules,
    raw_dir: &Path,
    resolver: Option<&PropertyResolver>,
    out_file: &Path,
) -> Result<Vec<CategorizedStructure>> {
    let categorizer = Categorizer::new(rules.clone());
    let extractor = StructureExtractor::new(rules);

    // Distinct component ids across the batch, resolved once each.
    let mut properties: BTreeMap<String, LigandProperties> = BTreeMap::new();
    if let Some(resolver) = resolver {
        for record in processed {
            for ligand in &record.ligands {
                if !properties.contains_key(&ligand.residue_name) {
                    let props = resolver.resolve(&ligand.residue_name).await;
                    properties.insert(ligand.residue_name.clone(), props);
                }
            }
        }
        info!("Resolved properties for {} components", properties.len());
    }

    let mut categorized = Vec::with_capacity(processed.len());
    for record in processed {
        let meta = metadata.get(&record.pdb_id.to_uppercase());

        let pdb = raw_file_for(raw_dir, &record.pdb_id)
            .and_then(|path| extractor.parse_structure(&path).ok());
        if pdb.is_none() {
            warn!(
                "Raw file for {} unavailable, skipping binding-site analysis",
                record.pdb_id
            );
        }

        categorized.push(categorizer.categorize(record, meta, pdb.as_ref(), &properties));
    }

    write_jsonl(out_file, &categorized)?;
    info!("Categorized {} structures", categorized.len());
    Ok(categorized)
}

pub fn load_categorized(path: &Path) -> Result<Vec<CategorizedStructure>> {
    read_jsonl(path)
}

/// Find the raw file for an accession, trying both supported formats.
fn raw_file_for(raw_dir: &Path, pdb_id: &str) -> Option<PathBuf> {
    for ext in ["pdb", "cif"] {
        let path = raw_dir.join(format!("{}.{}", pdb_id.to_lowercase(), ext));
        if path.exists() {
            return Some(path);
        }
    }
    None
}

// ── Import phase ──────────────────────────────────────────────────────────────

/// Import categorized structures into the relational store. Per-structure
/// failures are logged and the import continues; the whole batch is not
/// atomic.
pub async fn import_structures(
    repo: &Repository,
    structures: &[CategorizedStructure],
) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for s in structures {
        match import_one(repo, s).await {
            Ok(was_new) => {
                if was_new {
                    report.imported += 1;
                } else {
                    report.updated += 1;
                }
            }
            Err(e) => {
                warn!("Import failed for {}: {}", s.pdb_id, e);
                report.failed.push(s.pdb_id.clone());
            }
        }
    }

    info!(
        "Database import complete: {} new, {} updated, {} failed",
        report.imported,
        report.updated,
        report.failed.len()
    );
    Ok(report)
}

async fn import_one(repo: &Repository, s: &CategorizedStructure) -> Result<bool> {
    let protein = to_new_protein(s);
    let upsert = repo
        .upsert_protein(&protein)
        .await
        .context("protein upsert failed")?;

    let ligands: Vec<NewLigand> = s.ligands.iter().map(to_new_ligand).collect();
    repo.replace_ligands(upsert.protein_id, &ligands)
        .await
        .context("ligand insert failed")?;

    repo.assign_categories(upsert.protein_id, &s.categories)
        .await
        .context("category assignment failed")?;

    // Integrity record is write-once: a conflict just means an earlier run
    // already recorded this file.
    if let Some(sha) = &s.file_sha256 {
        match repo
            .record_integrity("structure_file", &s.pdb_id, sha, None)
            .await
        {
            Ok(_) | Err(ProtekaError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(upsert.was_new)
}

fn to_new_protein(s: &CategorizedStructure) -> NewProtein {
    let chain_data: BTreeMap<&str, serde_json::Value> = s
        .chains
        .iter()
        .map(|c| {
            (
                c.chain_id.as_str(),
                serde_json::json!({
                    "length": c.length,
                    "residue_range": c.residue_range,
                    "sequence": c.sequence,
                }),
            )
        })
        .collect();

    NewProtein {
        pdb_id: s.pdb_id.clone(),
        title: s.title.clone(),
        description: Some(format!("{} imported from the structure archive", s.pdb_id)),
        resolution: s.resolution,
        deposition_date: s.deposition_date,
        experiment_type: s.experiment_type.clone(),
        status: s.status.clone(),
        quality: s.quality.as_str().to_string(),
        num_chains: s.num_chains as i32,
        chain_data: serde_json::json!(chain_data),
    }
}

fn to_new_ligand(l: &crate::categorize::CategorizedLigand) -> NewLigand {
    NewLigand {
        residue_name: l.candidate.residue_name.clone(),
        chain_id: l.candidate.chain_id.clone(),
        residue_seq: l.candidate.residue_seq.clone(),
        num_atoms: l.candidate.num_atoms as i32,
        center: l.candidate.center,
        smiles: l.properties.smiles.clone(),
        inchi_key: l.properties.inchi_key.clone(),
        molecular_weight: l.properties.molecular_weight,
        logp: l.properties.logp,
        h_donors: l.properties.h_donors,
        h_acceptors: l.properties.h_acceptors,
        rotatable_bonds: l.properties.rotatable_bonds,
        tpsa: l.properties.tpsa,
        qed: l.properties.qed,
        binding_site: l
            .binding_site
            .as_ref()
            .and_then(|b| serde_json::to_value(b).ok()),
        binding_metrics: l.binding_metrics.clone(),
    }
}

// ── JSONL helpers ─────────────────────────────────────────────────────────────

fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    for record in records {
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut records = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("malformed record at {}:{}", path.display(), n + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::write_fixture;
    use proteka_common::config::CategorizerRules;

    #[test]
    fn test_process_phase_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let out = dir.path().join("structures.jsonl");

        let rules = CategorizerRules::default();
        let report = run_processing(&[fixture], &rules, &out).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.ligands_total, 1);
        assert!(report.failed.is_empty());

        let loaded = load_processed(&out).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].pdb_id, "1TST");
    }

    #[tokio::test]
    async fn test_categorize_phase_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let structures = dir.path().join("structures.jsonl");
        let categorized = dir.path().join("categorized.jsonl");

        let rules = CategorizerRules::default();
        run_processing(&[fixture], &rules, &structures).unwrap();
        let processed = load_processed(&structures).unwrap();

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "1TST".to_string(),
            EntryMetadata {
                title: Some("Fixture kinase".to_string()),
                resolution: Some(1.2),
                ..Default::default()
            },
        );

        let out = run_categorization(
            &processed,
            &metadata,
            &rules,
            dir.path(),
            None,
            &categorized,
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quality.as_str(), "high_quality");
        assert_eq!(out[0].categories, vec!["kinase"]);
        assert!(out[0].ligands[0].binding_site.is_some());

        let reloaded = load_categorized(&categorized).unwrap();
        assert_eq!(reloaded, out);
    }

    #[tokio::test]
    async fn test_categorize_phase_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let structures = dir.path().join("structures.jsonl");

        let rules = CategorizerRules::default();
        run_processing(&[fixture], &rules, &structures).unwrap();
        let processed = load_processed(&structures).unwrap();
        let metadata = BTreeMap::new();

        let a = run_categorization(
            &processed,
            &metadata,
            &rules,
            dir.path(),
            None,
            &dir.path().join("a.jsonl"),
        )
        .await
        .unwrap();
        let b = run_categorization(
            &processed,
            &metadata,
            &rules,
            dir.path(),
            None,
            &dir.path().join("b.jsonl"),
        )
        .await
        .unwrap();

        assert_eq!(a, b);
    }
}
