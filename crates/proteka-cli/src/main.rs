//! Proteka batch pipeline CLI.
//!
//! Phases compose in one invocation and each is idempotent over the same
//! identifiers:
//!
//! ```bash
//! proteka --download --resolution 2.0 --limit 50 --collect-metadata
//! proteka --process --categorize --import-db
//! proteka --db-stats
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use proteka_common::ProtekaConfig;
use proteka_db::models::NewDockingResult;
use proteka_db::Database;
use proteka_structures::docking::{
    prepare_ligand, prepare_receptor, write_ligand_pdb, DockingConfig, VinaRunner,
};
use proteka_structures::fetch::{load_metadata, StructureFetcher, StructureFormat};
use proteka_structures::pipeline;
use proteka_structures::properties::PropertyResolver;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "proteka", version)]
#[command(about = "Protein structure data management pipeline", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "PROTEKA_CONFIG")]
    config: Option<PathBuf>,

    /// Download structure files from the archive
    #[arg(long)]
    download: bool,

    /// Collect entry metadata while downloading
    #[arg(long)]
    collect_metadata: bool,

    /// Resolution cutoff (Å) for the archive search
    #[arg(long)]
    resolution: Option<f64>,

    /// Limit the number of structures to download
    #[arg(long)]
    limit: Option<usize>,

    /// File format to download: pdb or cif
    #[arg(long, default_value = "pdb")]
    format: String,

    /// Process downloaded structure files
    #[arg(long)]
    process: bool,

    /// Run categorization on processed structures
    #[arg(long)]
    categorize: bool,

    /// Metadata JSON file for categorization
    #[arg(long)]
    metadata_file: Option<PathBuf>,

    /// Specific accessions to categorize (default: all processed)
    #[arg(long, num_args = 1..)]
    pdb_ids: Option<Vec<String>>,

    /// Skip remote ligand property lookups
    #[arg(long)]
    offline: bool,

    /// Initialize the database schema
    #[arg(long)]
    init_db: bool,

    /// Import categorized structures into the database
    #[arg(long)]
    import_db: bool,

    /// Categorized JSONL file to import (default: processed dir)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Dock stored ligands for the accessions given via --pdb-ids
    #[arg(long)]
    dock: bool,

    /// AutoDock Vina executable
    #[arg(long, default_value = "vina")]
    vina: PathBuf,

    /// Display database statistics
    #[arg(long)]
    db_stats: bool,
}

impl Args {
    fn any_phase(&self) -> bool {
        self.download
            || self.process
            || self.categorize
            || self.init_db
            || self.import_db
            || self.dock
            || self.db_stats
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if !args.any_phase() {
        Args::command().print_help()?;
        return Ok(());
    }

    let config = ProtekaConfig::load(args.config.as_deref())?;
    let format: StructureFormat = args.format.parse()?;
    let raw_dir = PathBuf::from(&config.storage.raw_dir);
    let downloaded_file = Path::new(&config.storage.processed_dir).join("downloaded.json");

    if args.init_db {
        info!("Initializing database schema");
        let db = Database::connect(&config.database).await?;
        db.initialize().await?;
    }

    if args.download {
        run_download(&args, &config, format, &raw_dir, &downloaded_file).await?;
    }

    if args.process {
        run_process(&config, format, &raw_dir, &downloaded_file)?;
    }

    if args.categorize {
        run_categorize(&args, &config, &raw_dir).await?;
    }

    if args.import_db {
        run_import(&args, &config).await?;
    }

    if args.dock {
        run_dock(&args, &config, &raw_dir).await?;
    }

    if args.db_stats {
        let db = Database::connect(&config.database).await?;
        let stats = db.repository().stats().await?;
        info!("protein_count: {}", stats.protein_count);
        info!("ligand_count: {}", stats.ligand_count);
        info!("category_count: {}", stats.category_count);
        info!(
            "last_updated: {}",
            stats
                .last_updated
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
    }

    Ok(())
}

async fn run_download(
    args: &Args,
    config: &ProtekaConfig,
    format: StructureFormat,
    raw_dir: &Path,
    downloaded_file: &Path,
) -> Result<()> {
    info!("Starting archive download phase");
    let fetcher = StructureFetcher::new(raw_dir, &config.fetch)?;

    let resolution = args.resolution.unwrap_or(config.fetch.resolution_cutoff);
    let mut pdb_ids = fetcher.search_complexes(resolution, true).await?;

    let limit = args.limit.unwrap_or(config.fetch.max_structures);
    if pdb_ids.len() > limit {
        pdb_ids.truncate(limit);
        info!("Limited to {} structures", limit);
    }

    let downloaded = fetcher
        .batch_download(
            &pdb_ids,
            format,
            args.collect_metadata,
            &config.storage.metadata_file(),
        )
        .await?;

    // Remember what landed for the process phase.
    let ids: Vec<String> = downloaded
        .iter()
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    if let Some(parent) = downloaded_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        downloaded_file,
        serde_json::to_string(&serde_json::json!({ "pdb_ids": ids }))?,
    )?;

    info!("Downloaded {} structures", downloaded.len());
    Ok(())
}

fn run_process(
    config: &ProtekaConfig,
    format: StructureFormat,
    raw_dir: &Path,
    downloaded_file: &Path,
) -> Result<()> {
    info!("Starting processing phase");

    let paths: Vec<PathBuf> = if downloaded_file.exists() {
        let recorded: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(downloaded_file)?)?;
        recorded["pdb_ids"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|v| v.as_str())
            .map(|id| raw_dir.join(format!("{}.{}", id, format.extension())))
            .filter(|p| p.exists())
            .collect()
    } else {
        // No download manifest: process everything in the raw directory.
        let mut paths = Vec::new();
        if raw_dir.exists() {
            for entry in std::fs::read_dir(raw_dir)? {
                let path = entry?.path();
                if path
                    .extension()
                    .is_some_and(|e| e.to_str() == Some(format.extension()))
                {
                    paths.push(path);
                }
            }
        }
        paths.sort();
        paths
    };

    if paths.is_empty() {
        warn!("No structure files to process. Run with --download first.");
        return Ok(());
    }

    let report = pipeline::run_processing(
        &paths,
        &config.categorizer,
        &config.storage.structures_file(),
    )?;
    info!(
        "Processing phase complete: {} ok, {} failed",
        report.processed,
        report.failed.len()
    );
    Ok(())
}

async fn run_categorize(args: &Args, config: &ProtekaConfig, raw_dir: &Path) -> Result<()> {
    info!("Starting categorization phase");

    let structures_file = config.storage.structures_file();
    let mut processed = pipeline::load_processed(&structures_file)
        .context("no processed structures found; run with --process first")?;

    if let Some(ids) = &args.pdb_ids {
        let wanted: Vec<String> = ids.iter().map(|s| s.to_uppercase()).collect();
        processed.retain(|p| wanted.contains(&p.pdb_id));
        info!("Categorizing {} selected structures", processed.len());
    }

    let metadata_path = args
        .metadata_file
        .clone()
        .unwrap_or_else(|| config.storage.metadata_file());
    let metadata = if metadata_path.exists() {
        let map = load_metadata(&metadata_path)?;
        info!("Loaded metadata for {} structures", map.len());
        map
    } else {
        warn!(
            "Metadata file not found: {}. Categorization will be limited.",
            metadata_path.display()
        );
        BTreeMap::new()
    };

    let resolver = if args.offline {
        None
    } else {
        Some(PropertyResolver::new(config.categorizer.lipinski.clone())?)
    };

    let categorized = pipeline::run_categorization(
        &processed,
        &metadata,
        &config.categorizer,
        raw_dir,
        resolver.as_ref(),
        &config.storage.categorized_file(),
    )
    .await?;

    // Family distribution summary
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in &categorized {
        for family in &s.categories {
            *counts.entry(family.as_str()).or_default() += 1;
        }
    }
    info!("Category distribution:");
    for (family, count) in counts {
        info!("  {}: {} structures", family, count);
    }

    Ok(())
}

async fn run_import(args: &Args, config: &ProtekaConfig) -> Result<()> {
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.storage.categorized_file());
    info!("Importing {} into the database", input.display());

    let structures = pipeline::load_categorized(&input)
        .context("no categorized structures found; run with --categorize first")?;

    let db = Database::connect(&config.database).await?;
    db.initialize().await?;
    let report = pipeline::import_structures(&db.repository(), &structures).await?;

    if !report.failed.is_empty() {
        warn!("Import failures: {:?}", report.failed);
    }
    Ok(())
}

async fn run_dock(args: &Args, config: &ProtekaConfig, raw_dir: &Path) -> Result<()> {
    let Some(pdb_ids) = &args.pdb_ids else {
        warn!("--dock requires --pdb-ids");
        return Ok(());
    };

    let db = Database::connect(&config.database).await?;
    let repo = db.repository();
    let runner = VinaRunner::new(&args.vina);
    let dock_dir = Path::new(&config.storage.processed_dir).join("docking");

    for pdb_id in pdb_ids {
        let Some(detail) = repo.get_protein(pdb_id).await? else {
            warn!("{} not in database, skipping", pdb_id);
            continue;
        };
        let ligands = repo.ligands_for_protein(detail.protein.id).await?;
        if ligands.is_empty() {
            warn!("{} has no ligands to dock", pdb_id);
            continue;
        }

        let raw = raw_dir.join(format!("{}.pdb", pdb_id.to_lowercase()));
        if !raw.exists() {
            warn!("Raw file for {} not found, skipping", pdb_id);
            continue;
        }

        let receptor = match prepare_receptor(&raw, &dock_dir.join("receptors")).await {
            Ok(r) => r,
            Err(e) => {
                error!("Receptor preparation failed for {}: {}", pdb_id, e);
                continue;
            }
        };

        for ligand in &ligands {
            let result = dock_one(
                &runner, &raw, &receptor, &dock_dir, pdb_id, ligand,
            )
            .await;

            match result {
                Ok(outcome) => {
                    repo.insert_docking_result(&NewDockingResult {
                        protein_id: detail.protein.id,
                        ligand_id: ligand.id,
                        program: "vina".to_string(),
                        binding_affinity: outcome.binding_affinity,
                        rmsd: None,
                        poses: Some(outcome.poses as i32),
                        parameters: serde_json::json!({
                            "box_size": 20.0,
                            "exhaustiveness": 8,
                        }),
                    })
                    .await?;
                    info!(
                        "Docked {}/{}: {} kcal/mol",
                        pdb_id, ligand.residue_name, outcome.binding_affinity
                    );
                }
                Err(e) => {
                    error!(
                        "Docking failed for {}/{}: {}",
                        pdb_id, ligand.residue_name, e
                    );
                }
            }
        }
    }

    Ok(())
}

async fn dock_one(
    runner: &VinaRunner,
    raw: &Path,
    receptor: &Path,
    dock_dir: &Path,
    pdb_id: &str,
    ligand: &proteka_db::models::LigandRow,
) -> Result<proteka_structures::docking::DockingOutcome> {
    let ligand_pdb = write_ligand_pdb(
        raw,
        &ligand.residue_name,
        &ligand.chain_id,
        &ligand.residue_seq,
        &dock_dir.join("ligands").join(format!(
            "{}_{}_{}.pdb",
            pdb_id.to_lowercase(),
            ligand.chain_id,
            ligand.residue_seq
        )),
    )?;
    let prepared = prepare_ligand(&ligand_pdb, &dock_dir.join("ligands")).await?;
    tokio::fs::create_dir_all(dock_dir.join("poses")).await?;

    runner
        .run(&DockingConfig {
            receptor: receptor.to_path_buf(),
            ligand: prepared,
            center_x: ligand.center_x,
            center_y: ligand.center_y,
            center_z: ligand.center_z,
            box_size: 20.0,
            exhaustiveness: 8,
            out: dock_dir.join("poses").join(format!(
                "{}_{}_{}_out.pdbqt",
                pdb_id.to_lowercase(),
                ligand.chain_id,
                ligand.residue_seq
            )),
        })
        .await
}
