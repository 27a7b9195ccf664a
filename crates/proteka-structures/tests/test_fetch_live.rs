//! Live archive tests.
//!
//! Requires network access. Run with:
//! ```bash
//! cargo test --package proteka-structures --test test_fetch_live -- --ignored --nocapture
//! ```

use proteka_common::config::FetchConfig;
use proteka_structures::extract::{ProcessStatus, StructureExtractor};
use proteka_structures::fetch::{StructureFetcher, StructureFormat};
use tempfile::tempdir;

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires network access
async fn test_download_and_extract_crambin() {
    let dir = tempdir().unwrap();
    let fetcher = StructureFetcher::new(dir.path(), &FetchConfig::default()).unwrap();

    // 1CRN (crambin) is small and stable
    let path = fetcher.download("1CRN", StructureFormat::Pdb).await.unwrap();
    assert!(path.exists());

    // Second download hits the cache
    let again = fetcher.download("1CRN", StructureFormat::Pdb).await.unwrap();
    assert_eq!(path, again);

    let extractor = StructureExtractor::new(&Default::default());
    let record = extractor.process_file(&path);
    assert_eq!(record.status, ProcessStatus::Processed);
    assert_eq!(record.pdb_id, "1CRN");
    assert!(record.num_chains >= 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires network access
async fn test_search_returns_accessions() {
    let dir = tempdir().unwrap();
    let fetcher = StructureFetcher::new(dir.path(), &FetchConfig::default()).unwrap();

    let ids = fetcher.search_complexes(2.0, true).await.unwrap();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| id.len() == 4));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires network access
async fn test_metadata_for_known_entry() {
    let dir = tempdir().unwrap();
    let fetcher = StructureFetcher::new(dir.path(), &FetchConfig::default()).unwrap();

    let meta = fetcher.fetch_metadata("6LU7").await.unwrap();
    assert!(meta.title.is_some());
    assert!(meta.resolution.is_some());
}
