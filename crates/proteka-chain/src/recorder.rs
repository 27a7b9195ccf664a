//! Single-shot chain recording.
//!
//! Transaction construction and submission are delegated entirely to an
//! external wallet agent; this module validates the content identifier,
//! forwards it, and shapes the receipt. Failures surface without retry.

use crate::cid::validate_cid;
use proteka_common::config::ChainConfig;
use proteka_common::sandbox::SandboxClient as Client;
use proteka_common::{ProtekaError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Serialize)]
pub struct ChainReceipt {
    pub signature: String,
    pub explorer_url: String,
}

#[derive(Deserialize)]
struct AgentResponse {
    signature: Option<String>,
    error: Option<String>,
}

/// Records a content identifier on chain through the wallet agent.
pub struct ChainRecorder {
    client: Client,
    agent_url: String,
    cluster: String,
}

impl ChainRecorder {
    pub fn new(config: &ChainConfig) -> Result<Self> {
        let mut client = Client::new()?;
        // The agent may live outside the default allowlist.
        if let Ok(url) = Url::parse(&config.agent_url) {
            if let Some(host) = url.host_str() {
                client.allow_domain(host);
            }
        }

        Ok(Self {
            client,
            agent_url: config.agent_url.clone(),
            cluster: config.cluster.clone(),
        })
    }

    /// Validate the identifier and submit it. Returns the transaction
    /// signature and a human-readable explorer link.
    pub async fn record(&self, cid: &str) -> Result<ChainReceipt> {
        validate_cid(cid)?;

        info!("Submitting content identifier {} to wallet agent", cid);
        let response = self
            .client
            .post(&self.agent_url)?
            .json(&serde_json::json!({ "cid": cid }))
            .send()
            .await?
            .error_for_status()?;

        let body: AgentResponse = response.json().await?;
        match body.signature {
            Some(signature) => {
                let explorer_url = self.explorer_url(&signature);
                info!("Recorded {} as transaction {}", cid, signature);
                Ok(ChainReceipt {
                    signature,
                    explorer_url,
                })
            }
            None => Err(ProtekaError::Pipeline(format!(
                "wallet agent rejected submission: {}",
                body.error.unwrap_or_else(|| "no signature returned".to_string())
            ))),
        }
    }

    fn explorer_url(&self, signature: &str) -> String {
        format!(
            "https://explorer.solana.com/tx/{}?cluster={}",
            signature, self.cluster
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> ChainRecorder {
        ChainRecorder::new(&ChainConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_cid_fails_before_any_network_call() {
        let err = recorder().record("not-a-cid").await.unwrap_err();
        assert!(matches!(err, ProtekaError::Validation(_)));

        let err = recorder().record("").await.unwrap_err();
        assert!(matches!(err, ProtekaError::Validation(_)));
    }

    #[test]
    fn test_explorer_url_carries_cluster() {
        let url = recorder().explorer_url("5fAk3sig");
        assert_eq!(url, "https://explorer.solana.com/tx/5fAk3sig?cluster=devnet");
    }
}
