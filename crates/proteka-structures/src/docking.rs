//! Molecular docking via AutoDock Vina.
//!
//! Thin process wrappers: receptor/ligand preparation through the AutoDock
//! scripts, then a Vina run with the best-mode affinity parsed from its
//! log. A missing executable is a pipeline error the batch loop logs and
//! skips.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Configuration for a docking run.
#[derive(Debug, Clone)]
pub struct DockingConfig {
    pub receptor: PathBuf,
    pub ligand: PathBuf,
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    /// Cubic search box edge length (Å).
    pub box_size: f64,
    pub exhaustiveness: u32,
    pub out: PathBuf,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct DockingOutcome {
    pub out: PathBuf,
    /// Best-mode affinity in kcal/mol.
    pub binding_affinity: f64,
    pub poses: usize,
}

/// Prepare a protein receptor for docking via `prepare_receptor4.py`.
pub async fn prepare_receptor(protein_file: &Path, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let stem = protein_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let output = output_dir.join(format!("{}_prepared.pdbqt", stem));

    run_prepare("prepare_receptor4.py", "-r", protein_file, &output).await?;
    info!("Prepared receptor: {}", output.display());
    Ok(output)
}

/// Prepare a ligand file for docking via `prepare_ligand4.py`.
pub async fn prepare_ligand(ligand_file: &Path, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let stem = ligand_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let output = output_dir.join(format!("{}_prepared.pdbqt", stem));

    run_prepare("prepare_ligand4.py", "-l", ligand_file, &output).await?;
    info!("Prepared ligand: {}", output.display());
    Ok(output)
}

async fn run_prepare(script: &str, input_flag: &str, input: &Path, output: &Path) -> Result<()> {
    let result = Command::new(script)
        .arg(input_flag)
        .arg(input)
        .arg("-o")
        .arg(output)
        .arg("-A")
        .arg("hydrogens")
        .output()
        .await?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        anyhow::bail!("{} failed: {}", script, stderr);
    }
    Ok(())
}

/// Wrapper for AutoDock Vina execution.
pub struct VinaRunner {
    executable_path: PathBuf,
}

impl VinaRunner {
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
        }
    }

    /// Run Vina with the given configuration and parse the result table.
    pub async fn run(&self, config: &DockingConfig) -> Result<DockingOutcome> {
        info!("Running AutoDock Vina on {:?}", config.ligand);

        let output = Command::new(&self.executable_path)
            .arg("--receptor")
            .arg(&config.receptor)
            .arg("--ligand")
            .arg(&config.ligand)
            .arg("--center_x")
            .arg(config.center_x.to_string())
            .arg("--center_y")
            .arg(config.center_y.to_string())
            .arg("--center_z")
            .arg(config.center_z.to_string())
            .arg("--size_x")
            .arg(config.box_size.to_string())
            .arg("--size_y")
            .arg(config.box_size.to_string())
            .arg("--size_z")
            .arg(config.box_size.to_string())
            .arg("--exhaustiveness")
            .arg(config.exhaustiveness.to_string())
            .arg("--out")
            .arg(&config.out)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("AutoDock Vina failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (binding_affinity, poses) = parse_vina_output(&stdout)
            .ok_or_else(|| anyhow::anyhow!("could not parse Vina result table"))?;

        debug!(
            "Vina completed: best affinity {} kcal/mol over {} poses",
            binding_affinity, poses
        );

        Ok(DockingOutcome {
            out: config.out.clone(),
            binding_affinity,
            poses,
        })
    }
}

/// Write a ligand-only PDB file by filtering the raw file's HETATM records
/// for one residue group. Docking inputs are prepared from pdb-format
/// files; mmCIF raw files are not supported here.
pub fn write_ligand_pdb(
    raw: &Path,
    residue_name: &str,
    chain_id: &str,
    residue_seq: &str,
    out: &Path,
) -> Result<PathBuf> {
    let content = std::fs::read_to_string(raw)?;
    let mut lines = Vec::new();

    for line in content.lines() {
        if !line.starts_with("HETATM") || line.len() < 27 {
            continue;
        }
        let name = line[17..20].trim();
        let chain = line[21..22].trim();
        let seq = line[22..27].trim();
        if name.eq_ignore_ascii_case(residue_name) && chain == chain_id && seq == residue_seq {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        anyhow::bail!(
            "no HETATM records for {} {}/{} in {}",
            residue_name,
            chain_id,
            residue_seq,
            raw.display()
        );
    }

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, format!("{}\nEND\n", lines.join("\n")))?;
    Ok(out.to_path_buf())
}

/// Parse the Vina mode table. Rows look like:
/// `   1        -7.5      0.000      0.000`
/// Returns (best affinity, pose count).
pub fn parse_vina_output(stdout: &str) -> Option<(f64, usize)> {
    let mut best: Option<f64> = None;
    let mut poses = 0;

    for line in stdout.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        let (Ok(mode), Ok(affinity)) = (fields[0].parse::<u32>(), fields[1].parse::<f64>()) else {
            continue;
        };
        if fields[2].parse::<f64>().is_err() {
            continue;
        }

        poses += 1;
        if mode == 1 || best.is_none() {
            best = Some(best.map_or(affinity, |b: f64| b.min(affinity)));
        }
    }

    best.map(|b| (b, poses))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VINA_LOG: &str = "\
Performing docking (random seed: -123456789) ... done.

mode |   affinity | dist from best mode
     | (kcal/mol) | rmsd l.b.| rmsd u.b.
-----+------------+----------+----------
   1       -8.123          0          0
   2       -7.950      1.882      3.417
   3       -7.401      2.205      4.012
";

    #[test]
    fn test_parse_vina_output() {
        let (best, poses) = parse_vina_output(VINA_LOG).unwrap();
        assert!((best - (-8.123)).abs() < 1e-9);
        assert_eq!(poses, 3);
    }

    #[test]
    fn test_parse_vina_output_no_table() {
        assert!(parse_vina_output("Vina crashed before docking").is_none());
    }

    #[test]
    fn test_write_ligand_pdb_filters_one_group() {
        let dir = tempfile::tempdir().unwrap();
        let raw = crate::extract::tests::write_fixture(dir.path());
        let out = dir.path().join("lig.pdb");

        let path = write_ligand_pdb(&raw, "LIG", "A", "101", &out).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let hetatm_lines = content.lines().filter(|l| l.starts_with("HETATM")).count();
        assert_eq!(hetatm_lines, 7);
        assert!(!content.contains("HOH"));

        // Unknown group is an error, not an empty file
        assert!(write_ligand_pdb(&raw, "XYZ", "A", "1", &dir.path().join("x.pdb")).is_err());
    }
}
