// src/osint/sources/mod.rs
//! Source clients. Every client catches its own failures and reports them
//! inside the returned record, so callers never handle errors from a lookup.

mod dns;
mod email;
mod geo;
mod host_intel;
mod resolver;
mod whois;

use std::net::IpAddr;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

pub use dns::DnsClient;
pub use email::EmailVerifier;
pub use geo::GeoLocationClient;
pub use host_intel::ShodanClient;
pub use resolver::SystemResolver;
pub use whois::WhoisClient;

use super::model::{DnsAnswer, DnsRecords, GeoInfo, HostIntel, SourceResult, WhoisInfo};
use crate::error::OsintResult;

/// Record types queried by [`DnsLookup::lookup_all`], in query order
pub const SUPPORTED_RECORD_TYPES: [&str; 6] = ["A", "AAAA", "MX", "NS", "TXT", "SOA"];

/// Reported when no host intelligence key is configured
pub const HOST_INTEL_UNAVAILABLE: &str = "Shodan API not available";

/// IP geolocation source
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn lookup(&self, ip: &str) -> SourceResult<GeoInfo>;
}

/// WHOIS source
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WhoisLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> SourceResult<WhoisInfo>;
}

/// DNS record source
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Query a single record type
    async fn lookup(&self, domain: &str, record_type: &str) -> DnsAnswer;

    /// Query every supported record type. A failing type never affects its siblings.
    async fn lookup_all(&self, domain: &str) -> DnsRecords {
        let mut results = DnsRecords::new();

        for record_type in SUPPORTED_RECORD_TYPES {
            let answer = self.lookup(domain, record_type).await;
            results.insert(record_type.to_string(), answer);
        }

        results
    }
}

/// Host intelligence source (open ports, vulnerabilities)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostIntelLookup: Send + Sync {
    /// Whether the service is configured; an unavailable source makes no calls
    fn is_available(&self) -> bool;

    async fn lookup_ip(&self, ip: &str) -> SourceResult<HostIntel>;
}

/// Hostname to address resolution
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> OsintResult<IpAddr>;
}
