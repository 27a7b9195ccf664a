use crate::error::ProtekaError;
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// A sandbox-capped HTTP client that only allows requests to approved domains.
/// All outbound traffic from the pipeline and the chain recorder goes through
/// this wrapper so the set of reachable hosts stays auditable.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a new SandboxClient with the default allowlist of archive and
    /// chemistry endpoints the pipeline talks to.
    pub fn new() -> Result<Self, ProtekaError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "files.rcsb.org",     // structure file downloads
            "data.rcsb.org",      // entry + chemical component metadata
            "search.rcsb.org",    // structure search API
            "www.ebi.ac.uk",      // ChEMBL molecule properties
            "api.pinata.cloud",   // IPFS pinning
            "localhost",          // wallet agent default
            "127.0.0.1",          // localhost alt
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProtekaError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Check exact match or if it's a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, ProtekaError> {
        if !self.is_allowed(url) {
            return Err(ProtekaError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for POST requests.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, ProtekaError> {
        if !self.is_allowed(url) {
            return Err(ProtekaError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.post(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_domains_allowed() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://files.rcsb.org/download/1abc.pdb"));
        assert!(client.is_allowed("https://data.rcsb.org/rest/v1/core/entry/1ABC"));
        assert!(client.is_allowed("https://www.ebi.ac.uk/chembl/api/data/molecule/X"));
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://example.com/"));
        assert!(client.get("https://example.com/").is_err());
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://agent.internal/submit"));
        client.allow_domain("agent.internal");
        assert!(client.is_allowed("https://agent.internal/submit"));
    }
}
