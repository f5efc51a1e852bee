use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use geoweather_core::NetworkMonitor;
use reqwest::Url;
use tracing::debug;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Treats the network as available when the weather API host resolves.
#[derive(Debug, Clone)]
pub struct DnsReachability {
    host: String,
    port: u16,
}

impl DnsReachability {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_base_url(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("API base URL has no host: {base_url}"))?;
        let port = url.port_or_known_default().unwrap_or(443);
        Ok(Self::new(host, port))
    }
}

#[async_trait]
impl NetworkMonitor for DnsReachability {
    async fn is_network_available(&self) -> bool {
        let lookup = tokio::net::lookup_host((self.host.as_str(), self.port));
        match tokio::time::timeout(LOOKUP_TIMEOUT, lookup).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(error)) => {
                debug!(host = %self.host, %error, "Host lookup failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, "Host lookup timed out");
                false
            }
        }
    }
}
