//! Chain and ligand extraction from structure files.
//!
//! Parsing is delegated to pdbtbx at `StrictnessLevel::Loose` — many files
//! in the wild do not conform closely enough to the PDB/mmCIF specs for the
//! stricter levels. Extraction is deterministic: the same file always
//! yields the same records.

use anyhow::Result;
use pdbtbx::{ReadOptions, StrictnessLevel, PDB};
use proteka_common::config::CategorizerRules;
use proteka_common::hashing::hash_file;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error};

/// Per-chain summary stored in the protein's chain map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub chain_id: String,
    pub length: usize,
    /// `first-last` author residue numbers.
    pub residue_range: String,
    /// One-letter sequence; non-standard residues appear as `X`.
    pub sequence: String,
}

/// One hetero residue group that passed the ligand filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LigandCandidate {
    pub residue_name: String,
    pub chain_id: String,
    /// Author residue number, with insertion code where present.
    pub residue_seq: String,
    pub num_atoms: usize,
    pub center: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Processed,
    Failed,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Processed => "processed",
            ProcessStatus::Failed => "failed",
        }
    }
}

/// Flat record emitted per structure file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedStructure {
    pub pdb_id: String,
    pub status: ProcessStatus,
    pub num_models: usize,
    pub num_chains: usize,
    pub chains: Vec<ChainSummary>,
    pub ligands: Vec<LigandCandidate>,
    /// SHA-256 of the raw file, for the integrity record.
    pub file_sha256: Option<String>,
}

impl ProcessedStructure {
    fn failed(pdb_id: &str) -> Self {
        Self {
            pdb_id: pdb_id.to_uppercase(),
            status: ProcessStatus::Failed,
            num_models: 0,
            num_chains: 0,
            chains: Vec::new(),
            ligands: Vec::new(),
            file_sha256: None,
        }
    }
}

/// Extractor configured from the categorizer rule table (ligand atom
/// threshold and excluded residue names).
pub struct StructureExtractor {
    min_ligand_atoms: usize,
    excluded: HashSet<String>,
}

impl StructureExtractor {
    pub fn new(rules: &CategorizerRules) -> Self {
        Self {
            min_ligand_atoms: rules.min_ligand_atoms,
            excluded: rules
                .excluded_residues
                .iter()
                .map(|r| r.to_uppercase())
                .collect(),
        }
    }

    /// Parse a PDB or mmCIF file. The format is chosen from the extension.
    pub fn parse_structure(&self, path: &Path) -> Result<PDB> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 path: {}", path.display()))?;

        let (pdb, _errors) = ReadOptions::default()
            .set_level(StrictnessLevel::Loose)
            .read(path_str)
            .map_err(|errors| {
                anyhow::anyhow!(
                    "failed to parse {}: {}",
                    path.display(),
                    errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                )
            })?;

        Ok(pdb)
    }

    /// Protein chains: residues whose atoms are not hetero records.
    pub fn extract_chains(&self, pdb: &PDB) -> Vec<ChainSummary> {
        let mut chains = Vec::new();

        for chain in pdb.chains() {
            let residues: Vec<_> = chain
                .residues()
                .filter(|r| r.atoms().next().is_some_and(|a| !a.hetero()))
                .collect();

            if residues.is_empty() {
                continue;
            }

            let first = residues.first().map(|r| r.serial_number()).unwrap_or(0);
            let last = residues.last().map(|r| r.serial_number()).unwrap_or(0);
            let sequence: String = residues
                .iter()
                .map(|r| one_letter(r.name().unwrap_or("")))
                .collect();

            chains.push(ChainSummary {
                chain_id: chain.id().to_string(),
                length: residues.len(),
                residue_range: format!("{}-{}", first, last),
                sequence,
            });
        }

        chains
    }

    /// Candidate ligands: hetero residue groups above the atom threshold,
    /// excluding water and common crystallization additives.
    pub fn extract_ligands(&self, pdb: &PDB) -> Vec<LigandCandidate> {
        let mut ligands = Vec::new();

        for chain in pdb.chains() {
            for residue in chain.residues() {
                if !residue.atoms().next().is_some_and(|a| a.hetero()) {
                    continue;
                }

                let name = residue.name().unwrap_or("").to_uppercase();
                if name.is_empty() || self.excluded.contains(&name) {
                    continue;
                }

                let num_atoms = residue.atom_count();
                if num_atoms < self.min_ligand_atoms {
                    continue;
                }

                let mut center = [0.0f64; 3];
                for atom in residue.atoms() {
                    center[0] += atom.x();
                    center[1] += atom.y();
                    center[2] += atom.z();
                }
                let n = num_atoms as f64;
                center = [center[0] / n, center[1] / n, center[2] / n];

                let mut residue_seq = residue.serial_number().to_string();
                if let Some(code) = residue.insertion_code() {
                    residue_seq.push_str(code);
                }

                ligands.push(LigandCandidate {
                    residue_name: name,
                    chain_id: chain.id().to_string(),
                    residue_seq,
                    num_atoms,
                    center,
                });
            }
        }

        ligands
    }

    /// Process one file into a flat record. Parse failures yield a `failed`
    /// record rather than an error so batch processing continues.
    pub fn process_file(&self, path: &Path) -> ProcessedStructure {
        let pdb_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let pdb = match self.parse_structure(path) {
            Ok(pdb) => pdb,
            Err(e) => {
                error!("Error parsing structure {}: {}", path.display(), e);
                return ProcessedStructure::failed(&pdb_id);
            }
        };

        let chains = self.extract_chains(&pdb);
        let ligands = self.extract_ligands(&pdb);
        let file_sha256 = match hash_file(path) {
            Ok(h) => Some(h),
            Err(e) => {
                debug!("Could not hash {}: {}", path.display(), e);
                None
            }
        };

        ProcessedStructure {
            pdb_id: pdb_id.to_uppercase(),
            status: ProcessStatus::Processed,
            num_models: pdb.model_count(),
            num_chains: chains.len(),
            chains,
            ligands,
            file_sha256,
        }
    }
}

/// Three-letter residue code to one-letter, `X` for anything non-standard.
fn one_letter(res: &str) -> char {
    match res.to_uppercase().as_str() {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLN" => 'Q',
        "GLU" => 'E',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        _ => 'X',
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::io::Write as _;

    fn atom_line(
        record: &str,
        serial: usize,
        name: &str,
        res: &str,
        chain: char,
        seq: i32,
        x: f64,
        y: f64,
        z: f64,
        element: &str,
    ) -> String {
        format!(
            "{:<6}{:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
            record, serial, name, res, chain, seq, x, y, z, 1.00, 0.00, element
        )
    }

    /// A minimal but column-correct PDB: one protein chain of three
    /// residues, one seven-atom ligand, a water, and a sodium ion.
    pub(crate) fn fixture_pdb() -> String {
        let mut s = String::new();
        writeln!(s, "HEADER    TEST STRUCTURE").unwrap();

        let mut serial = 1;
        let backbone = [(" N ", "N"), (" CA", "C"), (" C ", "C"), (" O ", "O")];
        for (i, res) in ["ALA", "SER", "GLY"].iter().enumerate() {
            for (j, (name, elem)) in backbone.iter().enumerate() {
                let offset = i as f64 * 3.8 + j as f64 * 0.8;
                writeln!(
                    s,
                    "{}",
                    atom_line("ATOM", serial, name, res, 'A', i as i32 + 1, offset, 1.0, 2.0, elem)
                )
                .unwrap();
                serial += 1;
            }
        }

        // Ligand: seven carbons ~2.5 Å from the last residue
        for k in 0..7 {
            let name = format!(" C{}", k + 1);
            writeln!(
                s,
                "{}",
                atom_line("HETATM", serial, &name, "LIG", 'A', 101, 9.0 + k as f64 * 0.5, 2.5, 2.0, "C")
            )
            .unwrap();
            serial += 1;
        }

        // Water and an ion, both excluded
        writeln!(
            s,
            "{}",
            atom_line("HETATM", serial, " O  ", "HOH", 'A', 201, 30.0, 30.0, 30.0, "O")
        )
        .unwrap();
        serial += 1;
        writeln!(
            s,
            "{}",
            atom_line("HETATM", serial, "NA  ", " NA", 'A', 202, 40.0, 40.0, 40.0, "NA")
        )
        .unwrap();

        writeln!(s, "END").unwrap();
        s
    }

    pub(crate) fn write_fixture(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("1tst.pdb");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(fixture_pdb().as_bytes()).unwrap();
        path
    }

    fn extractor() -> StructureExtractor {
        StructureExtractor::new(&CategorizerRules::default())
    }

    #[test]
    fn test_extracts_chain_and_ligand() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let result = extractor().process_file(&path);
        assert_eq!(result.status, ProcessStatus::Processed);
        assert_eq!(result.pdb_id, "1TST");
        assert_eq!(result.num_chains, 1);
        assert_eq!(result.chains[0].length, 3);
        assert_eq!(result.chains[0].residue_range, "1-3");
        assert_eq!(result.chains[0].sequence, "ASG");

        assert_eq!(result.ligands.len(), 1, "only LIG survives the filters");
        let lig = &result.ligands[0];
        assert_eq!(lig.residue_name, "LIG");
        assert_eq!(lig.num_atoms, 7);
        assert_eq!(lig.residue_seq, "101");
        // Centroid x = 9.0 + (0..7)*0.5 averaged = 10.5
        assert!((lig.center[0] - 10.5).abs() < 1e-6);
    }

    #[test]
    fn test_water_and_small_groups_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let result = extractor().process_file(&path);
        assert!(result.ligands.iter().all(|l| l.residue_name != "HOH"));
        assert!(result.ligands.iter().all(|l| l.residue_name != "NA"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let ex = extractor();
        let a = ex.process_file(&path);
        let b = ex.process_file(&path);
        assert_eq!(a, b);

        let ja = serde_json::to_string(&a).unwrap();
        let jb = serde_json::to_string(&b).unwrap();
        assert_eq!(ja, jb, "derived records must be byte-identical");
    }

    #[test]
    fn test_unparseable_file_is_recorded_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("9bad.pdb");
        std::fs::write(&path, "this is not a structure file").unwrap();

        let result = extractor().process_file(&path);
        // Loose parsing may salvage an empty structure; either way the
        // record carries no chains and never panics.
        assert!(result.chains.is_empty());
        assert!(result.ligands.is_empty());
    }
}
