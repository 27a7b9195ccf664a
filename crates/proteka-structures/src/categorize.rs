//! Structure and ligand categorization.
//!
//! Everything here is a pure function of (extracted record, archive
//! metadata, rule table): re-running categorization over the same inputs
//! yields identical output, so the phase can be repeated freely.

use crate::extract::{LigandCandidate, ProcessedStructure};
use crate::fetch::EntryMetadata;
use crate::properties::LigandProperties;
use chrono::NaiveDate;
use pdbtbx::PDB;
use proteka_common::config::CategorizerRules;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Experimental quality band derived from resolution alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    HighQuality,
    MediumQuality,
    LowQuality,
    UnknownQuality,
}

impl QualityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityBand::HighQuality => "high_quality",
            QualityBand::MediumQuality => "medium_quality",
            QualityBand::LowQuality => "low_quality",
            QualityBand::UnknownQuality => "unknown_quality",
        }
    }
}

/// One protein residue near a ligand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingResidue {
    pub chain_id: String,
    pub residue_seq: isize,
    pub residue_name: String,
    /// Distance (Å) of the residue's nearest atom to any ligand atom.
    pub distance: f64,
}

/// Binding site summary for one ligand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSite {
    pub num_binding_residues: usize,
    /// Ordered nearest-first.
    pub binding_residues: Vec<BindingResidue>,
    pub avg_distance: Option<f64>,
    /// Fraction of binding residues with polar side chains.
    pub pocket_polarity: f64,
}

/// A ligand with everything the categorizer could attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedLigand {
    #[serde(flatten)]
    pub candidate: LigandCandidate,
    #[serde(default)]
    pub properties: LigandProperties,
    pub binding_site: Option<BindingSite>,
    pub binding_metrics: Option<serde_json::Value>,
}

/// The full per-structure output of the categorization phase; one JSON
/// line each in `categorized.jsonl`, and the unit of database import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedStructure {
    pub pdb_id: String,
    pub status: String,
    pub title: Option<String>,
    pub resolution: Option<f64>,
    pub deposition_date: Option<NaiveDate>,
    pub experiment_type: Option<String>,
    pub quality: QualityBand,
    pub num_chains: usize,
    pub chains: Vec<crate::extract::ChainSummary>,
    pub categories: Vec<String>,
    pub ligands: Vec<CategorizedLigand>,
    pub file_sha256: Option<String>,
}

pub struct Categorizer {
    rules: CategorizerRules,
    polar: HashSet<String>,
}

impl Categorizer {
    pub fn new(rules: CategorizerRules) -> Self {
        let polar = rules
            .polar_residues
            .iter()
            .map(|r| r.to_uppercase())
            .collect();
        Self { rules, polar }
    }

    /// Resolution bands. The boundary is exclusive on the high band:
    /// exactly `high_quality_max` (1.5 Å by default) is medium quality.
    pub fn quality_band(&self, resolution: Option<f64>) -> QualityBand {
        match resolution {
            Some(r) if r < self.rules.high_quality_max => QualityBand::HighQuality,
            Some(r) if r <= self.rules.medium_quality_max => QualityBand::MediumQuality,
            Some(_) => QualityBand::LowQuality,
            None => QualityBand::UnknownQuality,
        }
    }

    /// Keyword-matched family categories, deduplicated and sorted so the
    /// output is stable.
    pub fn family_categories(&self, title: &str, keywords: &[String]) -> Vec<String> {
        let title = title.to_lowercase();
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        let mut families: Vec<String> = self
            .rules
            .family_keywords
            .iter()
            .filter(|(_, words)| {
                words.iter().any(|w| {
                    title.contains(w.as_str()) || keywords.iter().any(|k| k.contains(w.as_str()))
                })
            })
            .map(|(family, _)| family.clone())
            .collect();

        families.sort();
        families.dedup();
        families
    }

    /// All protein residues whose nearest atom lies within the configured
    /// cutoff of any atom of the given ligand, nearest first.
    pub fn binding_site(&self, pdb: &PDB, ligand: &LigandCandidate) -> Option<BindingSite> {
        let ligand_atoms = collect_ligand_atoms(pdb, ligand)?;

        let mut residues = Vec::new();
        for chain in pdb.chains() {
            for residue in chain.residues() {
                if residue.atoms().next().is_some_and(|a| a.hetero()) {
                    continue;
                }

                let mut min_dist = f64::INFINITY;
                for atom in residue.atoms() {
                    let p = [atom.x(), atom.y(), atom.z()];
                    for l in &ligand_atoms {
                        let d = distance(&p, l);
                        if d < min_dist {
                            min_dist = d;
                        }
                    }
                }

                if min_dist <= self.rules.binding_site_cutoff {
                    residues.push(BindingResidue {
                        chain_id: chain.id().to_string(),
                        residue_seq: residue.serial_number(),
                        residue_name: residue.name().unwrap_or("").to_uppercase(),
                        distance: min_dist,
                    });
                }
            }
        }

        residues.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let avg_distance = if residues.is_empty() {
            None
        } else {
            Some(residues.iter().map(|r| r.distance).sum::<f64>() / residues.len() as f64)
        };
        let pocket_polarity = self.pocket_polarity(&residues);

        Some(BindingSite {
            num_binding_residues: residues.len(),
            binding_residues: residues,
            avg_distance,
            pocket_polarity,
        })
    }

    /// Fraction of binding residues in the polar set; 0.0 for an empty site.
    pub fn pocket_polarity(&self, residues: &[BindingResidue]) -> f64 {
        if residues.is_empty() {
            return 0.0;
        }
        let polar_count = residues
            .iter()
            .filter(|r| self.polar.contains(&r.residue_name))
            .count();
        polar_count as f64 / residues.len() as f64
    }

    /// Experimental binding values keyed to this ligand by component id.
    pub fn binding_metrics(
        &self,
        metadata: &EntryMetadata,
        ligand: &LigandCandidate,
    ) -> Option<serde_json::Value> {
        let mut metrics = BTreeMap::new();
        for affinity in &metadata.binding_affinities {
            if affinity.comp_id.eq_ignore_ascii_case(&ligand.residue_name) {
                metrics.insert(
                    affinity.metric.clone(),
                    serde_json::json!({
                        "value": affinity.value,
                        "unit": affinity.unit,
                        "provenance": affinity.provenance,
                        "reference": affinity.reference,
                    }),
                );
            }
        }

        if metrics.is_empty() {
            None
        } else {
            Some(serde_json::json!(metrics))
        }
    }

    /// Assemble the categorized record for one structure. `pdb` enables
    /// binding-site computation; without it ligands keep `binding_site:
    /// None` (e.g. when the raw file is gone).
    pub fn categorize(
        &self,
        processed: &ProcessedStructure,
        metadata: Option<&EntryMetadata>,
        pdb: Option<&PDB>,
        properties: &BTreeMap<String, LigandProperties>,
    ) -> CategorizedStructure {
        let resolution = metadata.and_then(|m| m.resolution);
        let title = metadata.and_then(|m| m.title.clone());
        let empty = Vec::new();
        let keywords = metadata.map(|m| &m.keywords).unwrap_or(&empty);

        let categories = self.family_categories(title.as_deref().unwrap_or(""), keywords);

        let ligands = processed
            .ligands
            .iter()
            .map(|candidate| CategorizedLigand {
                candidate: candidate.clone(),
                properties: properties
                    .get(&candidate.residue_name)
                    .cloned()
                    .unwrap_or_default(),
                binding_site: pdb.and_then(|p| self.binding_site(p, candidate)),
                binding_metrics: metadata.and_then(|m| self.binding_metrics(m, candidate)),
            })
            .collect();

        CategorizedStructure {
            pdb_id: processed.pdb_id.clone(),
            status: processed.status.as_str().to_string(),
            title,
            resolution,
            deposition_date: metadata.and_then(|m| m.deposition_date),
            experiment_type: metadata.and_then(|m| m.experimental_method.clone()),
            quality: self.quality_band(resolution),
            num_chains: processed.num_chains,
            chains: processed.chains.clone(),
            categories,
            ligands,
            file_sha256: processed.file_sha256.clone(),
        }
    }
}

fn collect_ligand_atoms(pdb: &PDB, ligand: &LigandCandidate) -> Option<Vec<[f64; 3]>> {
    for chain in pdb.chains() {
        if chain.id() != ligand.chain_id {
            continue;
        }
        for residue in chain.residues() {
            let mut residue_seq = residue.serial_number().to_string();
            if let Some(code) = residue.insertion_code() {
                residue_seq.push_str(code);
            }
            let name = residue.name().unwrap_or("").to_uppercase();
            if residue_seq == ligand.residue_seq && name == ligand.residue_name {
                let atoms: Vec<[f64; 3]> = residue
                    .atoms()
                    .map(|a| [a.x(), a.y(), a.z()])
                    .collect();
                return if atoms.is_empty() { None } else { Some(atoms) };
            }
        }
    }
    None
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{tests::write_fixture, StructureExtractor};

    fn categorizer() -> Categorizer {
        Categorizer::new(CategorizerRules::default())
    }

    #[test]
    fn test_quality_bands() {
        let c = categorizer();
        assert_eq!(c.quality_band(Some(1.2)), QualityBand::HighQuality);
        assert_eq!(c.quality_band(Some(2.0)), QualityBand::MediumQuality);
        assert_eq!(c.quality_band(Some(3.0)), QualityBand::MediumQuality);
        assert_eq!(c.quality_band(Some(3.2)), QualityBand::LowQuality);
        assert_eq!(c.quality_band(None), QualityBand::UnknownQuality);
    }

    #[test]
    fn test_exactly_one_point_five_is_medium() {
        // Band boundary: the high band is exclusive at 1.5 Å
        assert_eq!(
            categorizer().quality_band(Some(1.5)),
            QualityBand::MediumQuality
        );
    }

    #[test]
    fn test_family_categories_match_and_dedupe() {
        let c = categorizer();
        let families = c.family_categories(
            "Crystal structure of a tyrosine KINASE receptor",
            &["TRANSFERASE".to_string()],
        );
        // "kinase" from the title; "gpcr" and "nuclear_receptor" both via
        // "receptor", each exactly once, sorted
        assert_eq!(families, vec!["gpcr", "kinase", "nuclear_receptor"]);
    }

    #[test]
    fn test_family_categories_empty_without_matches() {
        let c = categorizer();
        assert!(c.family_categories("unremarkable protein", &[]).is_empty());
    }

    #[test]
    fn test_pocket_polarity() {
        let c = categorizer();
        let site = |name: &str| BindingResidue {
            chain_id: "A".to_string(),
            residue_seq: 1,
            residue_name: name.to_string(),
            distance: 3.0,
        };
        let residues = vec![site("SER"), site("ALA"), site("LYS"), site("LEU")];
        assert!((c.pocket_polarity(&residues) - 0.5).abs() < 1e-9);
        assert_eq!(c.pocket_polarity(&[]), 0.0);
    }

    #[test]
    fn test_binding_site_from_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let extractor = StructureExtractor::new(&CategorizerRules::default());
        let pdb = extractor.parse_structure(&path).unwrap();
        let processed = extractor.process_file(&path);
        assert_eq!(processed.ligands.len(), 1);

        let site = categorizer()
            .binding_site(&pdb, &processed.ligands[0])
            .expect("ligand resolvable in structure");

        // The GLY backbone sits ~1.5-2.6 Å from the first ligand atom; at
        // least that residue must be inside the 4.5 Å cutoff.
        assert!(site.num_binding_residues >= 1);
        assert!(site
            .binding_residues
            .iter()
            .any(|r| r.residue_name == "GLY"));
        // Ordered nearest first
        let dists: Vec<f64> = site.binding_residues.iter().map(|r| r.distance).collect();
        let mut sorted = dists.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(dists, sorted);
        assert!(site.avg_distance.is_some());
    }

    #[test]
    fn test_categorization_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let extractor = StructureExtractor::new(&CategorizerRules::default());
        let pdb = extractor.parse_structure(&path).unwrap();
        let processed = extractor.process_file(&path);

        let meta = EntryMetadata {
            title: Some("Test kinase complex".to_string()),
            resolution: Some(1.5),
            ..Default::default()
        };

        let c = categorizer();
        let props = BTreeMap::new();
        let a = c.categorize(&processed, Some(&meta), Some(&pdb), &props);
        let b = c.categorize(&processed, Some(&meta), Some(&pdb), &props);
        assert_eq!(a, b);
        assert_eq!(a.quality, QualityBand::MediumQuality);
        assert_eq!(a.categories, vec!["kinase"]);
    }

    #[test]
    fn test_binding_metrics_keyed_by_component() {
        let c = categorizer();
        let meta = EntryMetadata {
            binding_affinities: vec![crate::fetch::BindingAffinity {
                comp_id: "LIG".to_string(),
                metric: "Kd".to_string(),
                value: 42.0,
                unit: Some("nM".to_string()),
                provenance: Some("BindingDB".to_string()),
                reference: None,
            }],
            ..Default::default()
        };
        let ligand = LigandCandidate {
            residue_name: "LIG".to_string(),
            chain_id: "A".to_string(),
            residue_seq: "101".to_string(),
            num_atoms: 7,
            center: [0.0; 3],
        };
        let other = LigandCandidate {
            residue_name: "XYZ".to_string(),
            ..ligand.clone()
        };

        let metrics = c.binding_metrics(&meta, &ligand).unwrap();
        assert_eq!(metrics["Kd"]["value"], 42.0);
        assert!(c.binding_metrics(&meta, &other).is_none());
    }
}
