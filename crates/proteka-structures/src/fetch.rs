//! Structure and metadata fetching from the RCSB archive.
//!
//! Endpoints used:
//!   search:   https://search.rcsb.org/rcsbsearch/v2/query
//!   download: https://files.rcsb.org/download/{id}.{ext}
//!   entry:    https://data.rcsb.org/rest/v1/core/entry/{id}

use anyhow::Result;
use chrono::NaiveDate;
use proteka_common::config::FetchConfig;
use proteka_common::sandbox::SandboxClient as Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};

const SEARCH_URL: &str = "https://search.rcsb.org/rcsbsearch/v2/query";
const DOWNLOAD_URL: &str = "https://files.rcsb.org/download";
const ENTRY_URL: &str = "https://data.rcsb.org/rest/v1/core/entry";

/// The two supported archive file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    Pdb,
    Cif,
}

impl StructureFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            StructureFormat::Pdb => "pdb",
            StructureFormat::Cif => "cif",
        }
    }
}

impl std::str::FromStr for StructureFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pdb" => Ok(StructureFormat::Pdb),
            "cif" => Ok(StructureFormat::Cif),
            other => anyhow::bail!("unsupported structure format: {}", other),
        }
    }
}

/// Archive entry metadata distilled to the fields the categorizer consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub title: Option<String>,
    pub resolution: Option<f64>,
    pub r_free: Option<f64>,
    pub experimental_method: Option<String>,
    pub temperature: Option<f64>,
    pub deposition_date: Option<NaiveDate>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub binding_affinities: Vec<BindingAffinity>,
}

/// One experimentally measured binding value from the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingAffinity {
    /// Chemical component the measurement refers to.
    pub comp_id: String,
    /// Metric label, e.g. "Kd", "Ki", "IC50".
    pub metric: String,
    pub value: f64,
    pub unit: Option<String>,
    pub provenance: Option<String>,
    pub reference: Option<String>,
}

/// Client for fetching protein structures and entry metadata from RCSB.
pub struct StructureFetcher {
    client: Client,
    raw_dir: PathBuf,
    max_retries: u32,
    request_delay: Duration,
}

impl StructureFetcher {
    pub fn new<P: AsRef<Path>>(raw_dir: P, config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            raw_dir: raw_dir.as_ref().to_path_buf(),
            max_retries: config.max_retries,
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// Search the archive for protein entries under a resolution cutoff,
    /// optionally requiring deposited binding data. Returns accessions
    /// sorted by resolution, best first.
    pub async fn search_complexes(
        &self,
        resolution_cutoff: f64,
        require_binding_data: bool,
    ) -> Result<Vec<String>> {
        let query = build_complex_query(resolution_cutoff, require_binding_data);
        debug!(%resolution_cutoff, "Sending query to RCSB search");

        let resp: serde_json::Value = self
            .client
            .post(SEARCH_URL)?
            .json(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ids: Vec<String> = resp["result_set"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|r| r["identifier"].as_str())
            .map(|id| id.split('_').next().unwrap_or(id).to_string())
            .collect();

        info!("Found {} archive entries matching the query", ids.len());
        Ok(ids)
    }

    /// Download one structure file into the raw directory.
    /// An already-cached file short-circuits, so re-runs are idempotent.
    pub async fn download(&self, pdb_id: &str, format: StructureFormat) -> Result<PathBuf> {
        let file_name = format!("{}.{}", pdb_id.to_lowercase(), format.extension());
        let file_path = self.raw_dir.join(&file_name);

        if file_path.exists() {
            debug!("{} found in cache, skipping download", pdb_id);
            return Ok(file_path);
        }

        info!("Fetching {} from RCSB", pdb_id);
        let url = format!("{}/{}", DOWNLOAD_URL, file_name);
        let response = self.client.get(&url)?.send().await?.error_for_status()?;
        let content = response.bytes().await?;

        fs::create_dir_all(&self.raw_dir).await?;
        fs::write(&file_path, content).await?;

        Ok(file_path)
    }

    /// Fetch entry metadata and distill it for the categorizer.
    pub async fn fetch_metadata(&self, pdb_id: &str) -> Result<EntryMetadata> {
        let url = format!("{}/{}", ENTRY_URL, pdb_id.to_uppercase());
        let raw: serde_json::Value = self
            .client
            .get(&url)?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(distill_metadata(&raw))
    }

    /// Download a batch with bounded retries and rate limiting. Failures are
    /// logged and skipped; the batch always runs to completion. When
    /// `collect_metadata` is set, entry metadata is gathered alongside each
    /// download and persisted to `metadata_file` periodically and at the end.
    pub async fn batch_download(
        &self,
        pdb_ids: &[String],
        format: StructureFormat,
        collect_metadata: bool,
        metadata_file: &Path,
    ) -> Result<Vec<PathBuf>> {
        let total = pdb_ids.len();
        let mut downloaded = Vec::new();
        let mut metadata: BTreeMap<String, EntryMetadata> = BTreeMap::new();

        info!(
            "Starting batch download of {} structures in {} format",
            total,
            format.extension()
        );

        for (idx, pdb_id) in pdb_ids.iter().enumerate() {
            let mut success = false;

            for attempt in 0..self.max_retries {
                match self.download(pdb_id, format).await {
                    Ok(path) => {
                        downloaded.push(path);
                        success = true;

                        if collect_metadata {
                            match self.fetch_metadata(pdb_id).await {
                                Ok(meta) => {
                                    metadata.insert(pdb_id.to_uppercase(), meta);
                                }
                                Err(e) => {
                                    warn!("Metadata fetch failed for {}: {}", pdb_id, e)
                                }
                            }
                        }
                        break;
                    }
                    Err(e) => {
                        warn!(
                            "Retry {}/{} for {}: {}",
                            attempt + 1,
                            self.max_retries,
                            pdb_id,
                            e
                        );
                        tokio::time::sleep(self.request_delay * (attempt + 1)).await;
                    }
                }
            }

            if !success {
                error!(
                    "Failed to download {} after {} attempts",
                    pdb_id, self.max_retries
                );
            }

            let done = idx + 1;
            if done % 10 == 0 || done == total {
                info!("Progress: {}/{}", done, total);
                if collect_metadata && !metadata.is_empty() {
                    save_metadata(metadata_file, &metadata).await?;
                }
            }

            tokio::time::sleep(self.request_delay).await;
        }

        info!(
            "Batch download complete: {}/{} files",
            downloaded.len(),
            total
        );

        if collect_metadata && !metadata.is_empty() {
            save_metadata(metadata_file, &metadata).await?;
            info!("Saved metadata for {} structures", metadata.len());
        }

        Ok(downloaded)
    }
}

/// Search query for protein entries, optionally restricted to those with
/// deposited binding data.
pub fn build_complex_query(resolution_cutoff: f64, require_binding_data: bool) -> serde_json::Value {
    let mut nodes = vec![
        serde_json::json!({
            "type": "terminal",
            "service": "text",
            "parameters": {
                "attribute": "entity_poly.rcsb_entity_polymer_type",
                "operator": "exact_match",
                "value": "Protein"
            }
        }),
        serde_json::json!({
            "type": "terminal",
            "service": "text",
            "parameters": {
                "attribute": "rcsb_entry_info.resolution_combined",
                "operator": "less_or_equal",
                "value": resolution_cutoff
            }
        }),
    ];

    if require_binding_data {
        nodes.push(serde_json::json!({
            "type": "terminal",
            "service": "text",
            "parameters": {
                "attribute": "rcsb_binding_affinity.value",
                "operator": "exists"
            }
        }));
    }

    serde_json::json!({
        "query": {
            "type": "group",
            "logical_operator": "and",
            "nodes": nodes
        },
        "return_type": "entry",
        "request_options": {
            "paginate": { "start": 0, "rows": 1000 },
            "scoring_strategy": "combined",
            "sort": [
                { "sort_by": "rcsb_entry_info.resolution_combined", "direction": "asc" }
            ]
        }
    })
}

/// Pull the categorizer-relevant fields out of a raw entry document.
fn distill_metadata(raw: &serde_json::Value) -> EntryMetadata {
    let mut meta = EntryMetadata {
        title: raw["struct"]["title"].as_str().map(String::from),
        ..Default::default()
    };

    if let Some(refine) = raw["refine"].as_array().and_then(|a| a.first()) {
        meta.resolution = refine["ls_dres_high"].as_f64();
        meta.r_free = refine["ls_rfactor_rfree"].as_f64();
    }
    if let Some(exptl) = raw["exptl"].as_array().and_then(|a| a.first()) {
        meta.experimental_method = exptl["method"].as_str().map(String::from);
    }
    if let Some(diffrn) = raw["diffrn"].as_array().and_then(|a| a.first()) {
        meta.temperature = diffrn["ambient_temp"].as_f64();
    }
    if let Some(date) = raw["rcsb_accession_info"]["deposit_date"].as_str() {
        meta.deposition_date = NaiveDate::parse_from_str(&date[..10.min(date.len())], "%Y-%m-%d").ok();
    }
    if let Some(keywords) = raw["struct_keywords"]["pdbx_keywords"].as_str() {
        meta.keywords = keywords
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }
    if let Some(binding) = raw["rcsb_binding_affinity"].as_array() {
        for entry in binding {
            let (Some(comp_id), Some(metric), Some(value)) = (
                entry["comp_id"].as_str(),
                entry["type"].as_str(),
                entry["value"].as_f64(),
            ) else {
                continue;
            };
            meta.binding_affinities.push(BindingAffinity {
                comp_id: comp_id.to_string(),
                metric: metric.to_string(),
                value,
                unit: entry["unit"].as_str().map(String::from),
                provenance: entry["provenance_code"].as_str().map(String::from),
                reference: entry["reference_sequence_identity"]
                    .as_str()
                    .map(String::from),
            });
        }
    }

    meta
}

async fn save_metadata(path: &Path, metadata: &BTreeMap<String, EntryMetadata>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(path, json).await?;
    Ok(())
}

/// Load a previously collected metadata map, keyed by upper-case accession.
pub fn load_metadata(path: &Path) -> Result<BTreeMap<String, EntryMetadata>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_shape() {
        let query = build_complex_query(2.5, true);
        let nodes = query["query"]["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1]["parameters"]["value"], 2.5);

        let without_binding = build_complex_query(1.8, false);
        assert_eq!(without_binding["query"]["nodes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_distill_metadata() {
        let raw = serde_json::json!({
            "struct": { "title": "Kinase domain in complex with STI" },
            "refine": [{ "ls_dres_high": 1.8, "ls_rfactor_rfree": 0.21 }],
            "exptl": [{ "method": "X-RAY DIFFRACTION" }],
            "diffrn": [{ "ambient_temp": 100.0 }],
            "rcsb_accession_info": { "deposit_date": "2001-03-14T00:00:00+0000" },
            "struct_keywords": { "pdbx_keywords": "TRANSFERASE, KINASE" },
            "rcsb_binding_affinity": [
                { "comp_id": "STI", "type": "Kd", "value": 37.0, "unit": "nM",
                  "provenance_code": "BindingDB" }
            ]
        });

        let meta = distill_metadata(&raw);
        assert_eq!(meta.resolution, Some(1.8));
        assert_eq!(meta.experimental_method.as_deref(), Some("X-RAY DIFFRACTION"));
        assert_eq!(meta.deposition_date, NaiveDate::from_ymd_opt(2001, 3, 14));
        assert_eq!(meta.keywords, vec!["TRANSFERASE", "KINASE"]);
        assert_eq!(meta.binding_affinities.len(), 1);
        assert_eq!(meta.binding_affinities[0].comp_id, "STI");
    }

    #[test]
    fn test_distill_metadata_empty_document() {
        let meta = distill_metadata(&serde_json::json!({}));
        assert!(meta.title.is_none());
        assert!(meta.resolution.is_none());
        assert!(meta.binding_affinities.is_empty());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("pdb".parse::<StructureFormat>().unwrap(), StructureFormat::Pdb);
        assert_eq!("CIF".parse::<StructureFormat>().unwrap(), StructureFormat::Cif);
        assert!("xml".parse::<StructureFormat>().is_err());
    }
}
