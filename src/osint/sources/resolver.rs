// src/osint/sources/resolver.rs
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::lookup_host;
use tracing::debug;

use super::HostResolver;
use crate::error::{OsintError, OsintResult};

/// Hostname resolution through the operating system, preferring IPv4 answers
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> OsintResult<IpAddr> {
        let addrs: Vec<IpAddr> = tokio::time::timeout(self.timeout, lookup_host((host, 0)))
            .await
            .map_err(|_| OsintError::TimeoutError {
                operation: format!("resolve {}", host),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| OsintError::DnsError(format!("Failed to resolve {}: {}", host, e)))?
            .map(|addr| addr.ip())
            .collect();

        let ip = addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| OsintError::DnsError(format!("No address found for {}", host)))?;

        debug!("Resolved {} to {}", host, ip);
        Ok(ip)
    }
}
