// src/osint/sources/dns.rs
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, error, instrument};

use super::DnsLookup;
use crate::config::Config;
use crate::error::{OsintError, OsintResult};
use crate::osint::model::{DnsAnswer, DnsRecord};

/// DNS resolver client. Query timeout and total lookup lifetime share the API timeout.
#[derive(Clone)]
pub struct DnsClient {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsClient {
    pub fn new(timeout: Duration, nameserver: Option<&str>) -> OsintResult<Self> {
        let (config, mut opts) = match nameserver {
            Some(ns) => {
                let ip: IpAddr = ns
                    .parse()
                    .map_err(|_| OsintError::ConfigError(format!("Invalid nameserver IP: {}", ns)))?;

                let mut config = ResolverConfig::new();
                config.add_name_server(NameServerConfig::new(SocketAddr::new(ip, 53), Protocol::Udp));
                (config, ResolverOpts::default())
            }
            None => hickory_resolver::system_conf::read_system_conf()
                .unwrap_or_else(|e| {
                    debug!("System resolver configuration unavailable ({}), using defaults", e);
                    (ResolverConfig::default(), ResolverOpts::default())
                }),
        };

        opts.timeout = timeout;
        opts.attempts = 2;

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> OsintResult<Self> {
        Self::new(config.apis.timeout(), config.apis.nameserver.as_deref())
    }

    async fn query(&self, domain: &str, record_type: &str) -> OsintResult<Vec<DnsRecord>> {
        let rtype = RecordType::from_str(&record_type.to_uppercase())
            .map_err(|e| OsintError::DnsError(format!("Unsupported record type {}: {}", record_type, e)))?;

        let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup(domain, rtype))
            .await
            .map_err(|_| OsintError::TimeoutError {
                operation: format!("{} lookup for {}", record_type, domain),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| OsintError::DnsError(e.to_string()))?;

        let records: Vec<DnsRecord> = lookup
            .iter()
            .filter(|rdata| rdata.record_type() == rtype)
            .map(shape_record)
            .collect();

        if records.is_empty() {
            return Err(OsintError::DnsError(format!(
                "The DNS response does not contain an answer to the question: {} IN {}",
                domain, rtype
            )));
        }

        Ok(records)
    }
}

#[async_trait]
impl DnsLookup for DnsClient {
    #[instrument(skip(self))]
    async fn lookup(&self, domain: &str, record_type: &str) -> DnsAnswer {
        match self.query(domain, record_type).await {
            Ok(records) => DnsAnswer::found(domain, record_type, records),
            Err(e) => {
                error!("DNS lookup error for {} ({}): {}", domain, record_type, e);
                DnsAnswer::failed(domain, record_type, e.to_string())
            }
        }
    }
}

/// Shape one answer by type; types without a dedicated shape use their presentation form
pub(crate) fn shape_record(rdata: &RData) -> DnsRecord {
    match rdata {
        RData::A(a) => DnsRecord::Value(a.to_string()),
        RData::AAAA(aaaa) => DnsRecord::Value(aaaa.to_string()),
        RData::MX(mx) => DnsRecord::Mx {
            preference: mx.preference(),
            exchange: mx.exchange().to_string(),
        },
        RData::NS(ns) => DnsRecord::Value(ns.to_string()),
        RData::TXT(txt) => DnsRecord::Value(
            txt.iter()
                .map(|data| String::from_utf8_lossy(data).into_owned())
                .collect::<Vec<_>>()
                .join(""),
        ),
        RData::SOA(soa) => DnsRecord::Soa {
            mname: soa.mname().to_string(),
            rname: soa.rname().to_string(),
            serial: soa.serial(),
            refresh: soa.refresh(),
            retry: soa.retry(),
            expire: soa.expire(),
            minimum: soa.minimum(),
        },
        other => DnsRecord::Value(other.to_string()),
    }
}
