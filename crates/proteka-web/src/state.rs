//! Shared application state for the web server.

use proteka_chain::{ChainRecorder, IpfsClient};
use proteka_db::Repository;
use std::sync::Arc;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub repo: Repository,
    pub ipfs: IpfsClient,
    pub recorder: ChainRecorder,
}

impl AppState {
    pub fn new(repo: Repository, ipfs: IpfsClient, recorder: ChainRecorder) -> Self {
        Self {
            repo,
            ipfs,
            recorder,
        }
    }
}

pub type SharedState = Arc<AppState>;
