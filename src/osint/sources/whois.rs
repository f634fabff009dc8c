// src/osint/sources/whois.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, warn};

#[cfg(test)]
use mockall::automock;

use super::WhoisLookup;
use crate::error::{OsintError, OsintResult};
use crate::osint::model::{Registrant, SourceResult, WhoisInfo};

const WHOIS_PORT: u16 = 43;
const IANA_SERVER: &str = "whois.iana.org";
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;
const MAX_REFERRAL_DEPTH: usize = 3;

static WHOIS_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("com", "whois.verisign-grs.com"),
        ("net", "whois.verisign-grs.com"),
        ("org", "whois.pir.org"),
        ("info", "whois.afilias.net"),
        ("biz", "whois.biz"),
        ("io", "whois.nic.io"),
        ("co", "whois.nic.co"),
        ("me", "whois.nic.me"),
        ("dev", "whois.nic.google"),
        ("app", "whois.nic.google"),
        ("xyz", "whois.nic.xyz"),
        ("uk", "whois.nic.uk"),
        ("de", "whois.denic.de"),
        ("fr", "whois.nic.fr"),
        ("nl", "whois.domain-registry.nl"),
        ("eu", "whois.eu"),
        ("ru", "whois.tcinet.ru"),
        ("au", "whois.auda.org.au"),
        ("ca", "whois.cira.ca"),
        ("us", "whois.nic.us"),
    ])
});

const NOT_FOUND_MARKERS: [&str; 7] = [
    "no match for",
    "not found",
    "no data found",
    "no entries found",
    "status: free",
    "status: available",
    "no object found",
];

/// One WHOIS round trip: send `query` to `server`, return the raw answer
#[cfg_attr(test, automock)]
#[async_trait]
trait WhoisTransport: Send + Sync {
    async fn query(&self, server: &str, query: &str) -> OsintResult<String>;
}

/// Plain TCP on port 43
#[derive(Debug, Clone)]
struct TcpTransport {
    timeout: Duration,
}

#[async_trait]
impl WhoisTransport for TcpTransport {
    async fn query(&self, server: &str, query: &str) -> OsintResult<String> {
        let addr = format!("{}:{}", server, WHOIS_PORT);
        let seconds = self.timeout.as_secs();

        let mut stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| OsintError::TimeoutError { operation: format!("connect to {}", server), seconds })?
            .map_err(|e| OsintError::WhoisError(format!("Failed to connect to {}: {}", server, e)))?;

        timeout(self.timeout, stream.write_all(format!("{}\r\n", query).as_bytes()))
            .await
            .map_err(|_| OsintError::TimeoutError { operation: format!("query {}", server), seconds })?
            .map_err(|e| OsintError::WhoisError(format!("Failed to send query: {}", e)))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            match timeout(self.timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.len() > MAX_RESPONSE_SIZE {
                        return Err(OsintError::WhoisError("Response too large".to_string()));
                    }
                }
                Ok(Err(e)) => return Err(OsintError::WhoisError(format!("Read error: {}", e))),
                Err(_) if !response.is_empty() => break,
                Err(_) => {
                    return Err(OsintError::TimeoutError { operation: format!("read from {}", server), seconds });
                }
            }
        }

        // Registries still answer in Latin-1 now and then
        Ok(String::from_utf8(response)
            .unwrap_or_else(|e| e.into_bytes().iter().map(|&b| b as char).collect()))
    }
}

/// WHOIS protocol client (TCP port 43) with registry referral following
#[derive(Clone)]
pub struct WhoisClient {
    transport: Arc<dyn WhoisTransport>,
}

impl WhoisClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_transport(Arc::new(TcpTransport { timeout }))
    }

    fn with_transport(transport: Arc<dyn WhoisTransport>) -> Self {
        Self { transport }
    }

    async fn fetch(&self, domain: &str) -> OsintResult<WhoisInfo> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        let mut server = initial_server(&domain).to_string();
        let mut visited = HashSet::new();
        // Last answer that carried a referral; used when the referred server has nothing better
        let mut previous: Option<(String, String)> = None;

        loop {
            visited.insert(server.clone());
            debug!(server = %server, depth = visited.len(), "Querying WHOIS server for {}", domain);

            let response = match self.transport.query(&server, &domain).await {
                Ok(response) => response,
                Err(e) => match previous {
                    Some((registry, response)) => {
                        warn!("WHOIS referral to {} failed: {}", server, e);
                        return parse_whois(&domain, &registry, &response);
                    }
                    None => return Err(e),
                },
            };

            match extract_referral(&response) {
                Some(next) if !visited.contains(&next) && visited.len() < MAX_REFERRAL_DEPTH => {
                    previous = Some((server, response));
                    server = next;
                }
                _ => {
                    return match (parse_whois(&domain, &server, &response), previous) {
                        (Ok(info), _) => Ok(info),
                        (Err(e), Some((registry, registry_response))) => {
                            warn!("WHOIS referral to {} unusable ({}), keeping {} answer", server, e, registry);
                            parse_whois(&domain, &registry, &registry_response)
                        }
                        (Err(e), None) => Err(e),
                    };
                }
            }
        }
    }
}

#[async_trait]
impl WhoisLookup for WhoisClient {
    async fn lookup(&self, domain: &str) -> SourceResult<WhoisInfo> {
        let result = self.fetch(domain).await;
        if let Err(e) = &result {
            error!("WHOIS error for {}: {}", domain, e);
        }

        result.into()
    }
}

fn initial_server(domain: &str) -> &'static str {
    domain
        .rsplit('.')
        .next()
        .and_then(|tld| WHOIS_SERVERS.get(tld).copied())
        .unwrap_or(IANA_SERVER)
}

fn extract_referral(response: &str) -> Option<String> {
    for (key, value) in fields(response) {
        if matches!(key.as_str(), "registrar whois server" | "whois server" | "refer" | "whois") {
            let server = value
                .trim_start_matches("whois://")
                .trim_end_matches('/')
                .to_lowercase();
            if !server.is_empty() && server.contains('.') && !server.contains(' ') {
                return Some(server);
            }
        }
    }
    None
}

/// `key: value` pairs in response order, keys lowercased
fn fields(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with('%') && !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let value = value.trim();
            if value.is_empty() || value.eq_ignore_ascii_case("redacted for privacy") {
                return None;
            }
            Some((key.trim().to_lowercase(), value.to_string()))
        })
        .collect()
}

fn first(fields: &[(String, String)], keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| fields.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone()))
}

fn all(fields: &[(String, String)], keys: &[&str]) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for (key, value) in fields {
        if keys.contains(&key.as_str()) && !values.contains(value) {
            values.push(value.clone());
        }
    }
    values
}

/// Normalize a raw WHOIS response. Dates are reduced to the first value and
/// rendered `YYYY-MM-DD` when they parse, otherwise kept verbatim.
pub(crate) fn parse_whois(domain: &str, server: &str, raw: &str) -> OsintResult<WhoisInfo> {
    let lower = raw.to_lowercase();
    if raw.trim().is_empty() || NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        return Err(OsintError::WhoisError(format!("No match for \"{}\"", domain)));
    }

    let fields = fields(raw);

    let date = |keys: &[&str]| first(&fields, keys).map(|value| format_date(&value));

    let name_servers = all(&fields, &["name server", "nameserver", "nserver", "name servers"])
        .into_iter()
        .map(|ns| ns.split_whitespace().next().unwrap_or_default().to_lowercase())
        .fold(Vec::new(), |mut acc: Vec<String>, ns| {
            if !ns.is_empty() && !acc.contains(&ns) {
                acc.push(ns);
            }
            acc
        });

    let status = all(&fields, &["domain status", "status", "state"])
        .into_iter()
        .filter_map(|s| s.split_whitespace().next().map(str::to_string))
        .fold(Vec::new(), |mut acc: Vec<String>, s| {
            if !acc.contains(&s) {
                acc.push(s);
            }
            acc
        });

    let emails = fields
        .iter()
        .filter(|(key, value)| key.contains("email") && value.contains('@'))
        .fold(Vec::new(), |mut acc: Vec<String>, (_, value)| {
            let email = value.to_lowercase();
            if !acc.contains(&email) {
                acc.push(email);
            }
            acc
        });

    if name_servers.is_empty() && first(&fields, &["registrar", "domain name"]).is_none() {
        warn!("WHOIS response for {} carried no recognizable fields", domain);
    }

    Ok(WhoisInfo {
        domain: domain.to_string(),
        registrar: first(&fields, &["registrar", "registrar name", "sponsoring registrar"]),
        creation_date: date(&["creation date", "created date", "created on", "created", "registered on", "registration time"]),
        expiration_date: date(&["registry expiry date", "registrar registration expiration date", "expiration date", "expiry date", "expires on", "paid-till"]),
        updated_date: date(&["updated date", "last updated on", "last modified", "changed", "last update"]),
        name_servers,
        status,
        emails,
        dnssec: first(&fields, &["dnssec"]),
        registrant: Registrant {
            name: first(&fields, &["registrant name", "registrant"]),
            organization: first(&fields, &["registrant organization", "registrant organisation", "org"]),
            country: first(&fields, &["registrant country", "country"]),
        },
        whois_server: Some(server.to_string()),
    })
}

fn format_date(value: &str) -> String {
    let cleaned = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return dt.format("%Y-%m-%d").to_string();
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return dt.format("%Y-%m-%d").to_string();
        }
    }

    const DATE_FORMATS: [&str; 6] = ["%Y-%m-%d", "%d-%b-%Y", "%d-%B-%Y", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }

    cleaned.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    const VERISIGN_SAMPLE: &str = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Updated Date: 2023-08-14T07:01:38Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2024-08-13T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited
   Name Server: A.IANA-SERVERS.NET
   Name Server: B.IANA-SERVERS.NET
   DNSSEC: signedDelegation
   Registrant Organization: Internet Assigned Numbers Authority
   Registrant Country: US
   Registrar Abuse Contact Email: abuse@iana.org
>>> Last update of whois database: 2024-01-01T00:00:00Z <<<
";

    #[test]
    fn test_parse_gtld_response() {
        let info = parse_whois("example.com", "whois.verisign-grs.com", VERISIGN_SAMPLE).unwrap();

        assert_eq!(info.registrar.as_deref(), Some("RESERVED-Internet Assigned Numbers Authority"));
        assert_eq!(info.creation_date.as_deref(), Some("1995-08-14"));
        assert_eq!(info.expiration_date.as_deref(), Some("2024-08-13"));
        assert_eq!(info.updated_date.as_deref(), Some("2023-08-14"));
        assert_eq!(info.name_servers, vec!["a.iana-servers.net", "b.iana-servers.net"]);
        assert_eq!(info.status, vec!["clientDeleteProhibited", "clientTransferProhibited"]);
        assert_eq!(info.dnssec.as_deref(), Some("signedDelegation"));
        assert_eq!(info.registrant.organization.as_deref(), Some("Internet Assigned Numbers Authority"));
        assert_eq!(info.registrant.country.as_deref(), Some("US"));
        assert_eq!(info.emails, vec!["abuse@iana.org"]);
        assert_eq!(info.whois_server.as_deref(), Some("whois.verisign-grs.com"));
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        let raw = "Domain Name: example.test\nCreation Date: before 1996\nName Server: ns1.example.test\n";
        let info = parse_whois("example.test", "whois.example", raw).unwrap();
        assert_eq!(info.creation_date.as_deref(), Some("before 1996"));
        assert!(info.expiration_date.is_none());
    }

    #[test]
    fn test_first_date_wins() {
        let raw = "Domain Name: x.org\nCreated: 2001-02-03\nCreated: 2010-01-01\n";
        let info = parse_whois("x.org", "whois.pir.org", raw).unwrap();
        assert_eq!(info.creation_date.as_deref(), Some("2001-02-03"));
    }

    #[test]
    fn test_no_match_is_error() {
        let raw = "No match for \"NOPE-NOT-REAL.COM\".\n>>> Last update of whois database <<<\n";
        let err = parse_whois("nope-not-real.com", "whois.verisign-grs.com", raw).unwrap_err();
        assert!(err.to_string().contains("No match"));
    }

    #[test]
    fn test_name_servers_always_list() {
        let raw = "Domain Name: solo.io\nName Server: NS1.SOLO.IO 192.0.2.1\n";
        let info = parse_whois("solo.io", "whois.nic.io", raw).unwrap();
        assert_eq!(info.name_servers, vec!["ns1.solo.io"]);
        assert!(info.status.is_empty());
    }

    #[test]
    fn test_referral_extraction() {
        assert_eq!(extract_referral("refer:        whois.verisign-grs.com\n").as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(extract_referral("Registrar WHOIS Server: whois.markmonitor.com\n").as_deref(), Some("whois.markmonitor.com"));
        assert!(extract_referral("Domain Name: EXAMPLE.COM\n").is_none());
    }

    #[test]
    fn test_initial_server() {
        assert_eq!(initial_server("example.com"), "whois.verisign-grs.com");
        assert_eq!(initial_server("example.museum"), IANA_SERVER);
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2020-01-15T00:00:00Z"), "2020-01-15");
        assert_eq!(format_date("15-Jan-2020"), "2020-01-15");
        assert_eq!(format_date("2020.01.15"), "2020-01-15");
        assert_eq!(format_date("2020-01-15T00:00:00+02:00"), "2020-01-15");
    }

    const REGISTRY_REFERRAL: &str = "\
   Domain Name: EXAMPLE.COM
   Registrar WHOIS Server: whois.registrar.test
   Registrar: Example Registrar, Inc.
   Creation Date: 1995-08-14T04:00:00Z
   Name Server: A.IANA-SERVERS.NET
";

    fn client_with(answers: Vec<(&'static str, OsintResult<String>)>) -> WhoisClient {
        let mut transport = MockWhoisTransport::new();
        for (server, answer) in answers {
            let mut answer = Some(answer);
            transport
                .expect_query()
                .with(eq(server), eq("example.com"))
                .times(1)
                .returning(move |_, _| answer.take().unwrap_or_else(|| Ok(String::new())));
        }
        WhoisClient::with_transport(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_registrar_not_found_keeps_registry_answer() {
        let client = client_with(vec![
            ("whois.verisign-grs.com", Ok(REGISTRY_REFERRAL.to_string())),
            ("whois.registrar.test", Ok("Domain not found.\n".to_string())),
        ]);

        let info = client.fetch("example.com").await.unwrap();
        assert_eq!(info.whois_server.as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(info.registrar.as_deref(), Some("Example Registrar, Inc."));
        assert_eq!(info.creation_date.as_deref(), Some("1995-08-14"));
    }

    #[tokio::test]
    async fn test_unreachable_registrar_keeps_registry_answer() {
        let client = client_with(vec![
            ("whois.verisign-grs.com", Ok(REGISTRY_REFERRAL.to_string())),
            ("whois.registrar.test", Err(OsintError::WhoisError("Failed to connect".to_string()))),
        ]);

        let info = client.fetch("EXAMPLE.COM.").await.unwrap();
        assert_eq!(info.whois_server.as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(info.name_servers, vec!["a.iana-servers.net"]);
    }

    #[tokio::test]
    async fn test_registrar_answer_preferred() {
        let registrar = "Domain Name: example.com\nRegistrar WHOIS Server: whois.registrar.test\nRegistrar: Registrar Direct LLC\n";
        let client = client_with(vec![
            ("whois.verisign-grs.com", Ok(REGISTRY_REFERRAL.to_string())),
            ("whois.registrar.test", Ok(registrar.to_string())),
        ]);

        let info = client.fetch("example.com").await.unwrap();
        assert_eq!(info.whois_server.as_deref(), Some("whois.registrar.test"));
        assert_eq!(info.registrar.as_deref(), Some("Registrar Direct LLC"));
    }

    #[tokio::test]
    async fn test_registry_no_match_is_error() {
        let client = client_with(vec![(
            "whois.verisign-grs.com",
            Ok("No match for \"EXAMPLE.COM\".\n".to_string()),
        )]);

        let result = client.lookup("example.com").await;
        assert!(result.error().unwrap().contains("No match"));
    }
}
