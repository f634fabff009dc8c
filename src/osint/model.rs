// src/osint/model.rs
use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Serialize, Deserialize};

use crate::target::TargetType;

/// Normalized outcome of a single source client call.
///
/// Serializes either as the populated record itself or as `{"error": "..."}`,
/// never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceResult<T> {
    Failed { error: String },
    Found(T),
}

impl<T> SourceResult<T> {
    pub fn failed(message: impl Into<String>) -> Self {
        SourceResult::Failed { error: message.into() }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SourceResult::Failed { error } => Some(error),
            SourceResult::Found(_) => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SourceResult::Found(value) => Some(value),
            SourceResult::Failed { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SourceResult::Found(_))
    }
}

impl<T, E: Display> From<Result<T, E>> for SourceResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => SourceResult::Found(value),
            Err(e) => SourceResult::failed(e.to_string()),
        }
    }
}

/// IP geolocation record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub asn: Option<String>,
    pub org: Option<String>,
    pub timezone: Option<String>,
}

/// Registrant block of a WHOIS record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registrant {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub country: Option<String>,
}

/// Normalized WHOIS record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoisInfo {
    pub domain: String,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub updated_date: Option<String>,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    pub dnssec: Option<String>,
    #[serde(default)]
    pub registrant: Registrant,
    pub whois_server: Option<String>,
}

/// One DNS answer, shaped by record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DnsRecord {
    Mx {
        preference: u16,
        exchange: String,
    },
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: i32,
        retry: i32,
        expire: i32,
        minimum: u32,
    },
    /// Addresses (A/AAAA), target names (NS), text (TXT) and any other type
    Value(String),
}

impl Display for DnsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsRecord::Mx { preference, exchange } => write!(f, "{} {}", preference, exchange),
            DnsRecord::Soa { mname, rname, serial, refresh, retry, expire, minimum } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname, rname, serial, refresh, retry, expire, minimum
            ),
            DnsRecord::Value(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecordSet {
    pub records: Vec<DnsRecord>,
}

/// Result of querying one record type for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsAnswer {
    pub domain: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(flatten)]
    pub outcome: SourceResult<DnsRecordSet>,
}

impl DnsAnswer {
    pub fn found(domain: &str, record_type: &str, records: Vec<DnsRecord>) -> Self {
        Self {
            domain: domain.to_string(),
            record_type: record_type.to_string(),
            outcome: SourceResult::Found(DnsRecordSet { records }),
        }
    }

    pub fn failed(domain: &str, record_type: &str, error: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            record_type: record_type.to_string(),
            outcome: SourceResult::failed(error),
        }
    }

    pub fn records(&self) -> Option<&[DnsRecord]> {
        self.outcome.value().map(|set| set.records.as_slice())
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.error()
    }
}

/// Answers keyed by record type
pub type DnsRecords = BTreeMap<String, DnsAnswer>;

/// Host intelligence record (open ports, known vulnerabilities, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostIntel {
    pub ip: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub org: Option<String>,
    pub isp: Option<String>,
    pub asn: Option<String>,
    pub os: Option<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub vulns: Vec<String>,
    pub last_update: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Email address verification flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailVerification {
    pub email: String,
    pub format_valid: bool,
    pub domain_exists: bool,
    pub has_mx_records: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpFindings {
    pub geolocation: SourceResult<GeoInfo>,
    pub host_intel: SourceResult<HostIntel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainFindings {
    pub whois: SourceResult<WhoisInfo>,
    pub dns: DnsRecords,
    /// Resolved address, `None` when resolution failed
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<SourceResult<GeoInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailFindings {
    pub verification: EmailVerification,
    /// Domain search for the mail domain; a domain result never embeds email data
    pub domain_info: Option<DomainResult>,
}

/// Either a rejected target or the completed fetch phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultBody<F> {
    Rejected {
        error: String,
    },
    Completed {
        execution_time: f64,
        #[serde(flatten)]
        findings: F,
    },
}

/// Result for one classified target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedResult<F> {
    pub target: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub body: ResultBody<F>,
}

impl<F> TypedResult<F> {
    pub fn rejected(target: &str, timestamp: String, error: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            timestamp,
            body: ResultBody::Rejected { error: error.into() },
        }
    }

    pub fn completed(target: &str, timestamp: String, execution_time: f64, findings: F) -> Self {
        Self {
            target: target.to_string(),
            timestamp,
            body: ResultBody::Completed { execution_time, findings },
        }
    }

    pub fn findings(&self) -> Option<&F> {
        match &self.body {
            ResultBody::Completed { findings, .. } => Some(findings),
            ResultBody::Rejected { .. } => None,
        }
    }

    pub fn execution_time(&self) -> Option<f64> {
        match &self.body {
            ResultBody::Completed { execution_time, .. } => Some(*execution_time),
            ResultBody::Rejected { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.body {
            ResultBody::Rejected { error } => Some(error),
            ResultBody::Completed { .. } => None,
        }
    }
}

pub type IpResult = TypedResult<IpFindings>;
pub type DomainResult = TypedResult<DomainFindings>;
pub type EmailResult = TypedResult<EmailFindings>;

/// Aggregated outcome of one search, tagged by target type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResult {
    Ip(IpResult),
    Domain(DomainResult),
    Email(EmailResult),
    Unknown {
        target: String,
        error: String,
    },
}

impl SearchResult {
    pub fn unknown(target: &str) -> Self {
        SearchResult::Unknown {
            target: target.to_string(),
            error: "Unknown target type".to_string(),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            SearchResult::Ip(r) => &r.target,
            SearchResult::Domain(r) => &r.target,
            SearchResult::Email(r) => &r.target,
            SearchResult::Unknown { target, .. } => target,
        }
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            SearchResult::Ip(_) => TargetType::Ip,
            SearchResult::Domain(_) => TargetType::Domain,
            SearchResult::Email(_) => TargetType::Email,
            SearchResult::Unknown { .. } => TargetType::Unknown,
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            SearchResult::Ip(r) => Some(&r.timestamp),
            SearchResult::Domain(r) => Some(&r.timestamp),
            SearchResult::Email(r) => Some(&r.timestamp),
            SearchResult::Unknown { .. } => None,
        }
    }

    pub fn execution_time(&self) -> Option<f64> {
        match self {
            SearchResult::Ip(r) => r.execution_time(),
            SearchResult::Domain(r) => r.execution_time(),
            SearchResult::Email(r) => r.execution_time(),
            SearchResult::Unknown { .. } => None,
        }
    }

    /// Top-level error, set only for unknown or rejected targets
    pub fn error(&self) -> Option<&str> {
        match self {
            SearchResult::Ip(r) => r.error(),
            SearchResult::Domain(r) => r.error(),
            SearchResult::Email(r) => r.error(),
            SearchResult::Unknown { error, .. } => Some(error),
        }
    }

    /// Completed searches are the ones that get a history record
    pub fn is_completed(&self) -> bool {
        self.execution_time().is_some()
    }
}
