//! JSON pinning via the Pinata API.

use proteka_common::config::IpfsConfig;
use proteka_common::sandbox::SandboxClient as Client;
use proteka_common::{ProtekaError, Result};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Deserialize)]
struct PinataResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Client for pinning JSON documents to IPFS.
pub struct IpfsClient {
    client: Client,
    api_url: String,
    jwt_token: Option<String>,
}

impl IpfsClient {
    pub fn new(config: &IpfsConfig) -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            api_url: config.api_url.clone(),
            jwt_token: config.jwt_token.clone(),
        })
    }

    /// Pin a JSON document and return its content hash.
    pub async fn upload_json(&self, document: &serde_json::Value) -> Result<String> {
        let token = self.jwt_token.as_ref().ok_or_else(|| {
            ProtekaError::Config(
                "PINATA_JWT_TOKEN is not set; cannot pin to IPFS".to_string(),
            )
        })?;

        debug!("Pinning JSON document to IPFS");
        let response = self
            .client
            .post(&self.api_url)?
            .bearer_auth(token)
            .json(document)
            .send()
            .await?
            .error_for_status()?;

        let body: PinataResponse = response.json().await?;
        let hash = body.ipfs_hash.ok_or_else(|| {
            ProtekaError::Pipeline("pinning service returned no IPFS hash".to_string())
        })?;

        info!("Pinned document as {}", hash);
        Ok(hash)
    }
}
