// src/osint/orchestrator.rs
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::model::{
    DnsAnswer, DnsRecords, DomainFindings, DomainResult, EmailFindings, EmailResult,
    EmailVerification, HostIntel, IpFindings, IpResult, SearchResult, SourceResult,
};
use super::sources::{
    DnsClient, DnsLookup, EmailVerifier, GeoLocationClient, GeoLocator, HostIntelLookup,
    HostResolver, ShodanClient, SystemResolver, WhoisClient, WhoisLookup,
    HOST_INTEL_UNAVAILABLE, SUPPORTED_RECORD_TYPES,
};
use crate::config::Config;
use crate::error::OsintResult;
use crate::history::{HistoryRecord, HistoryStore, JsonlHistoryStore};
use crate::reporting::{ExportFormat, ExportManager};
use crate::target::{self, TargetType};
use crate::utils::timestamp_now;

/// Source clients used by the orchestrator
#[derive(Clone)]
pub struct Sources {
    pub geo: Arc<dyn GeoLocator>,
    pub whois: Arc<dyn WhoisLookup>,
    pub dns: Arc<dyn DnsLookup>,
    pub host_intel: Arc<dyn HostIntelLookup>,
    pub resolver: Arc<dyn HostResolver>,
}

impl Sources {
    pub fn from_config(config: &Config) -> OsintResult<Self> {
        let timeout = config.apis.timeout();

        Ok(Self {
            geo: Arc::new(GeoLocationClient::from_config(config)?),
            whois: Arc::new(WhoisClient::new(timeout)),
            dns: Arc::new(DnsClient::from_config(config)?),
            host_intel: Arc::new(ShodanClient::from_config(config)?),
            resolver: Arc::new(SystemResolver::new(timeout)),
        })
    }
}

/// Classifies a target, runs the matching lookups and records the outcome
pub struct SearchOrchestrator {
    sources: Sources,
    verifier: EmailVerifier,
    history: Arc<dyn HistoryStore>,
    exporter: ExportManager,
    parallel: bool,
    deadline: Option<Duration>,
}

impl SearchOrchestrator {
    pub fn new(sources: Sources, history: Arc<dyn HistoryStore>, exporter: ExportManager) -> Self {
        let verifier = EmailVerifier::new(sources.resolver.clone(), sources.dns.clone());

        Self {
            sources,
            verifier,
            history,
            exporter,
            parallel: false,
            deadline: None,
        }
    }

    /// Issue independent lookups concurrently
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Bound every fan-out phase by `deadline`
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn from_config(config: &Config) -> OsintResult<Self> {
        let sources = Sources::from_config(config)?;
        let history = JsonlHistoryStore::open(config.history_path()).await?;
        let exporter = ExportManager::new(config.paths.exports.clone());

        Ok(Self::new(sources, Arc::new(history), exporter)
            .with_parallel(config.search.parallel)
            .with_deadline(config.search.deadline_secs.map(Duration::from_secs)))
    }

    /// Run a full search. Completed results are appended to history.
    pub async fn search(&self, target: &str) -> SearchResult {
        let target_type = target::classify(target);
        info!("Searching {} as {}", target, target_type);

        let result = match target_type {
            TargetType::Ip => SearchResult::Ip(self.search_ip(target).await),
            TargetType::Domain => SearchResult::Domain(self.search_domain(target).await),
            TargetType::Email => SearchResult::Email(self.search_email(target).await),
            TargetType::Unknown => {
                warn!("Unknown target type: {}", target);
                return SearchResult::unknown(target);
            }
        };

        if result.is_completed() {
            self.record(target, target_type, &result).await;
        } else if let Some(error) = result.error() {
            warn!("Rejected {}: {}", target, error);
        }

        result
    }

    pub async fn search_ip(&self, ip: &str) -> IpResult {
        let timestamp = timestamp_now();
        if !target::is_ip(ip) {
            return IpResult::rejected(ip, timestamp, "Invalid IP address format");
        }

        let started = Instant::now();
        let findings = self.ip_findings(ip).await;

        IpResult::completed(ip, timestamp, started.elapsed().as_secs_f64(), findings)
    }

    pub async fn search_domain(&self, domain: &str) -> DomainResult {
        let timestamp = timestamp_now();
        if !target::is_domain(domain) {
            return DomainResult::rejected(domain, timestamp, "Invalid domain format");
        }

        let started = Instant::now();
        let findings = self.domain_findings(domain).await;

        DomainResult::completed(domain, timestamp, started.elapsed().as_secs_f64(), findings)
    }

    /// Verifies the address, then searches its domain once when the domain resolves
    pub async fn search_email(&self, email: &str) -> EmailResult {
        let timestamp = timestamp_now();
        if !EmailVerifier::validate_format(email) {
            return EmailResult::rejected(email, timestamp, "Invalid email format");
        }

        let started = Instant::now();

        let verification = self
            .within_deadline("email verification", self.verifier.verify(email), |message| {
                warn!("{}", message);
                EmailVerification {
                    email: email.to_string(),
                    format_valid: true,
                    ..Default::default()
                }
            })
            .await;

        let domain_info = match EmailVerifier::email_domain(email) {
            Some(domain) if verification.domain_exists => Some(self.search_domain(domain).await),
            _ => None,
        };

        EmailResult::completed(
            email,
            timestamp,
            started.elapsed().as_secs_f64(),
            EmailFindings { verification, domain_info },
        )
    }

    pub async fn history(&self, limit: usize) -> OsintResult<Vec<HistoryRecord>> {
        self.history.recent(limit).await
    }

    pub async fn history_record(&self, id: u64) -> OsintResult<Option<HistoryRecord>> {
        self.history.get(id).await
    }

    pub async fn export(
        &self,
        result: &SearchResult,
        path: Option<&Path>,
        format: ExportFormat,
    ) -> OsintResult<PathBuf> {
        self.exporter.export(result, path, format).await
    }

    pub fn exporter(&self) -> &ExportManager {
        &self.exporter
    }

    async fn record(&self, target: &str, target_type: TargetType, result: &SearchResult) {
        match self.history.append(target, target_type, result).await {
            Ok(id) => info!("Saved search for {} as history record {}", target, id),
            Err(e) => error!("Failed to save search history for {}: {}", target, e),
        }
    }

    async fn ip_findings(&self, ip: &str) -> IpFindings {
        let fetch = async {
            if self.parallel {
                let (geolocation, host_intel) =
                    tokio::join!(self.sources.geo.lookup(ip), self.host_intel(ip));
                IpFindings { geolocation, host_intel }
            } else {
                let geolocation = self.sources.geo.lookup(ip).await;
                let host_intel = self.host_intel(ip).await;
                IpFindings { geolocation, host_intel }
            }
        };

        self.within_deadline("ip lookups", fetch, |message| IpFindings {
            geolocation: SourceResult::failed(message.clone()),
            host_intel: SourceResult::failed(message),
        })
        .await
    }

    async fn host_intel(&self, ip: &str) -> SourceResult<HostIntel> {
        if !self.sources.host_intel.is_available() {
            debug!("Host intelligence not configured, skipping {}", ip);
            return SourceResult::failed(HOST_INTEL_UNAVAILABLE);
        }
        self.sources.host_intel.lookup_ip(ip).await
    }

    async fn domain_findings(&self, domain: &str) -> DomainFindings {
        let fetch = async {
            let (whois, dns, resolved) = if self.parallel {
                tokio::join!(
                    self.sources.whois.lookup(domain),
                    self.sources.dns.lookup_all(domain),
                    self.sources.resolver.resolve(domain),
                )
            } else {
                let whois = self.sources.whois.lookup(domain).await;
                let dns = self.sources.dns.lookup_all(domain).await;
                let resolved = self.sources.resolver.resolve(domain).await;
                (whois, dns, resolved)
            };

            let ip = match resolved {
                Ok(ip) => Some(ip.to_string()),
                Err(e) => {
                    warn!("Could not resolve {}: {}", domain, e);
                    None
                }
            };

            let geolocation = match &ip {
                Some(ip) => Some(self.sources.geo.lookup(ip).await),
                None => None,
            };

            DomainFindings { whois, dns, ip, geolocation }
        };

        self.within_deadline("domain lookups", fetch, |message| DomainFindings {
            whois: SourceResult::failed(message.clone()),
            dns: SUPPORTED_RECORD_TYPES
                .iter()
                .map(|t| (t.to_string(), DnsAnswer::failed(domain, t, message.clone())))
                .collect::<DnsRecords>(),
            ip: None,
            geolocation: None,
        })
        .await
    }

    /// Await `fetch`, or build a fallback from the deadline message once the deadline passes
    async fn within_deadline<T, F>(&self, phase: &str, fetch: F, on_timeout: impl FnOnce(String) -> T) -> T
    where
        F: Future<Output = T>,
    {
        let Some(deadline) = self.deadline else {
            return fetch.await;
        };

        match tokio::time::timeout(deadline, fetch).await {
            Ok(value) => value,
            Err(_) => {
                let message = format!("Deadline of {} seconds exceeded", deadline.as_secs());
                error!("{} for {}", message, phase);
                on_timeout(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use mockall::predicate::eq;
    use crate::error::OsintError;
    use crate::history::{MemoryHistoryStore, MockHistoryStore};
    use crate::osint::model::{DnsRecord, GeoInfo, WhoisInfo};
    use crate::osint::sources::{
        MockDnsLookup, MockGeoLocator, MockHostIntelLookup, MockHostResolver, MockWhoisLookup,
    };

    struct Mocks {
        geo: MockGeoLocator,
        whois: MockWhoisLookup,
        dns: MockDnsLookup,
        host_intel: MockHostIntelLookup,
        resolver: MockHostResolver,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                geo: MockGeoLocator::new(),
                whois: MockWhoisLookup::new(),
                dns: MockDnsLookup::new(),
                host_intel: MockHostIntelLookup::new(),
                resolver: MockHostResolver::new(),
            }
        }

        /// Every source fails the test if called
        fn untouched() -> Self {
            let mut mocks = Self::new();
            mocks.geo.expect_lookup().never();
            mocks.whois.expect_lookup().never();
            mocks.dns.expect_lookup().never();
            mocks.dns.expect_lookup_all().never();
            mocks.host_intel.expect_is_available().never();
            mocks.host_intel.expect_lookup_ip().never();
            mocks.resolver.expect_resolve().never();
            mocks
        }

        fn into_sources(self) -> Sources {
            Sources {
                geo: Arc::new(self.geo),
                whois: Arc::new(self.whois),
                dns: Arc::new(self.dns),
                host_intel: Arc::new(self.host_intel),
                resolver: Arc::new(self.resolver),
            }
        }
    }

    fn orchestrator(mocks: Mocks, history: Arc<dyn HistoryStore>) -> SearchOrchestrator {
        let exporter = ExportManager::new(std::env::temp_dir().join("osintkit-tests"));
        SearchOrchestrator::new(mocks.into_sources(), history, exporter)
    }

    fn testville() -> GeoInfo {
        GeoInfo {
            ip: Some("203.0.113.5".to_string()),
            city: Some("Testville".to_string()),
            country: Some("Testland".to_string()),
            ..Default::default()
        }
    }

    fn all_dns(domain: &str) -> DnsRecords {
        SUPPORTED_RECORD_TYPES
            .iter()
            .map(|t| {
                let answer = match *t {
                    "A" => DnsAnswer::found(domain, t, vec![DnsRecord::Value("192.0.2.10".to_string())]),
                    "MX" => DnsAnswer::found(domain, t, vec![DnsRecord::Mx {
                        preference: 10,
                        exchange: format!("mail.{}.", domain),
                    }]),
                    _ => DnsAnswer::failed(domain, t, "no record found"),
                };
                (t.to_string(), answer)
            })
            .collect()
    }

    /// Sources for a domain that resolves to 192.0.2.10 and has MX records
    fn resolving_domain_mocks() -> Mocks {
        let mut mocks = Mocks::new();
        mocks.whois.expect_lookup().returning(|domain| {
            SourceResult::Found(WhoisInfo {
                domain: domain.to_string(),
                registrar: Some("Example Registrar".to_string()),
                ..Default::default()
            })
        });
        mocks.dns.expect_lookup_all().returning(|domain| all_dns(domain));
        mocks.dns.expect_lookup().returning(|domain, t| {
            all_dns(domain).remove(t).unwrap_or_else(|| DnsAnswer::failed(domain, t, "no record found"))
        });
        mocks.resolver.expect_resolve().returning(|_| Ok(IpAddr::from([192, 0, 2, 10])));
        mocks.geo.expect_lookup().returning(|ip| {
            SourceResult::Found(GeoInfo { ip: Some(ip.to_string()), ..Default::default() })
        });
        mocks
    }

    #[tokio::test]
    async fn test_unknown_target_appends_nothing() {
        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(Mocks::untouched(), history.clone());

        let result = orch.search("not a target!").await;

        assert_eq!(result, SearchResult::unknown("not a target!"));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_ip_guard_makes_no_calls() {
        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(Mocks::untouched(), history.clone());

        // Classification trims, the re-validation of the raw string does not
        let result = orch.search(" 8.8.8.8").await;

        assert_eq!(result.target_type(), TargetType::Ip);
        assert_eq!(result.error(), Some("Invalid IP address format"));
        assert!(result.execution_time().is_none());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_domain_guard_makes_no_calls() {
        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(Mocks::untouched(), history.clone());

        let result = orch.search(" example.com").await;

        assert_eq!(result.target_type(), TargetType::Domain);
        assert_eq!(result.error(), Some("Invalid domain format"));
        assert!(result.execution_time().is_none());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_ip_search_with_host_intel_unavailable() {
        let mut mocks = Mocks::new();
        mocks.geo
            .expect_lookup()
            .with(eq("203.0.113.5"))
            .times(1)
            .returning(|_| SourceResult::Found(testville()));
        mocks.host_intel.expect_is_available().return_const(false);
        mocks.host_intel.expect_lookup_ip().never();

        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(mocks, history.clone());

        let result = orch.search("203.0.113.5").await;

        let SearchResult::Ip(ip) = &result else {
            panic!("expected an ip result, got {:?}", result);
        };
        let findings = ip.findings().unwrap();
        assert_eq!(findings.geolocation.value().unwrap().city.as_deref(), Some("Testville"));
        assert_eq!(findings.host_intel.error(), Some("Shodan API not available"));
        assert!(ip.execution_time().unwrap() >= 0.0);

        let records = history.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_type, TargetType::Ip);
        assert_eq!(records[0].results, result);
    }

    #[tokio::test]
    async fn test_ip_search_with_host_intel() {
        let mut mocks = Mocks::new();
        mocks.geo.expect_lookup().returning(|_| SourceResult::failed("HTTP Error: 429"));
        mocks.host_intel.expect_is_available().return_const(true);
        mocks.host_intel.expect_lookup_ip().times(1).returning(|ip| {
            SourceResult::Found(HostIntel {
                ip: ip.to_string(),
                ports: vec![22, 443],
                ..Default::default()
            })
        });

        let orch = orchestrator(mocks, Arc::new(MemoryHistoryStore::new())).with_parallel(true);
        let result = orch.search_ip("198.51.100.7").await;

        let findings = result.findings().unwrap();
        assert_eq!(findings.geolocation.error(), Some("HTTP Error: 429"));
        assert_eq!(findings.host_intel.value().unwrap().ports, vec![22, 443]);
    }

    #[tokio::test]
    async fn test_domain_search_resolves_and_geolocates() {
        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(resolving_domain_mocks(), history.clone());

        let result = orch.search("Example.COM").await;

        let SearchResult::Domain(domain) = &result else {
            panic!("expected a domain result, got {:?}", result);
        };
        let findings = domain.findings().unwrap();
        assert_eq!(findings.whois.value().unwrap().registrar.as_deref(), Some("Example Registrar"));
        assert_eq!(findings.dns.len(), SUPPORTED_RECORD_TYPES.len());
        assert_eq!(findings.ip.as_deref(), Some("192.0.2.10"));
        assert!(findings.geolocation.as_ref().unwrap().is_found());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_domain_has_no_geolocation() {
        let mut mocks = Mocks::new();
        mocks.whois.expect_lookup().returning(|_| SourceResult::failed("connection refused"));
        mocks.dns.expect_lookup_all().returning(|domain| {
            SUPPORTED_RECORD_TYPES
                .iter()
                .map(|t| (t.to_string(), DnsAnswer::failed(domain, t, "NXDOMAIN")))
                .collect()
        });
        mocks.resolver
            .expect_resolve()
            .returning(|host| Err(OsintError::DnsError(format!("No address found for {}", host))));
        mocks.geo.expect_lookup().never();

        let orch = orchestrator(mocks, Arc::new(MemoryHistoryStore::new())).with_parallel(true);
        let result = orch.search_domain("nothing-here.example").await;

        let findings = result.findings().unwrap();
        assert!(findings.ip.is_none());
        assert!(findings.geolocation.is_none());
        assert_eq!(findings.whois.error(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_email_search_embeds_one_domain_level() {
        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(resolving_domain_mocks(), history.clone());

        let result = orch.search("alice@example.org").await;

        let SearchResult::Email(email) = &result else {
            panic!("expected an email result, got {:?}", result);
        };
        let findings = email.findings().unwrap();
        assert!(findings.verification.format_valid);
        assert!(findings.verification.domain_exists);
        assert!(findings.verification.has_mx_records);

        let domain_info = findings.domain_info.as_ref().unwrap();
        assert_eq!(domain_info.target, "example.org");
        assert!(domain_info.findings().is_some());

        let value = serde_json::to_value(&result).unwrap();
        assert!(value["domain_info"].get("domain_info").is_none());
        assert!(value["domain_info"].get("verification").is_none());

        // The nested domain search is not recorded on its own
        let records = history.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, "alice@example.org");
    }

    #[tokio::test]
    async fn test_email_with_unresolved_domain_skips_domain_search() {
        let mut mocks = Mocks::untouched();
        mocks.resolver = MockHostResolver::new();
        mocks.resolver
            .expect_resolve()
            .times(1)
            .returning(|_| Err(OsintError::DnsError("no address".to_string())));

        let orch = orchestrator(mocks, Arc::new(MemoryHistoryStore::new()));
        let result = orch.search_email("bob@nowhere.invalid").await;

        let findings = result.findings().unwrap();
        assert!(!findings.verification.domain_exists);
        assert!(findings.domain_info.is_none());
    }

    #[tokio::test]
    async fn test_email_classified_but_invalid_is_rejected() {
        let history = Arc::new(MemoryHistoryStore::new());
        let orch = orchestrator(Mocks::untouched(), history.clone());

        let result = orch.search("a b@example.org").await;

        assert_eq!(result.target_type(), TargetType::Email);
        assert_eq!(result.error(), Some("Invalid email format"));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_failure_still_returns_result() {
        let mut mocks = Mocks::new();
        mocks.geo.expect_lookup().returning(|_| SourceResult::Found(testville()));
        mocks.host_intel.expect_is_available().return_const(false);

        let mut history = MockHistoryStore::new();
        history
            .expect_append()
            .times(1)
            .returning(|_, _, _| Err(OsintError::HistoryError("disk full".to_string())));

        let orch = orchestrator(mocks, Arc::new(history));
        let result = orch.search("203.0.113.5").await;

        assert!(result.is_completed());
    }

    #[tokio::test]
    async fn test_history_is_most_recent_first() {
        let mut mocks = Mocks::new();
        mocks.geo.expect_lookup().returning(|_| SourceResult::Found(GeoInfo::default()));
        mocks.host_intel.expect_is_available().return_const(false);

        let orch = orchestrator(mocks, Arc::new(MemoryHistoryStore::new()));
        for ip in ["192.0.2.1", "192.0.2.2", "192.0.2.3"] {
            orch.search(ip).await;
        }

        let all = orch.history(10).await.unwrap();
        let targets: Vec<_> = all.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["192.0.2.3", "192.0.2.2", "192.0.2.1"]);

        let two = orch.history(2).await.unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].target, "192.0.2.3");

        let first = orch.history_record(all[2].id).await.unwrap().unwrap();
        assert_eq!(first.target, "192.0.2.1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_marks_slow_phase() {
        struct SlowGeo;

        #[async_trait::async_trait]
        impl GeoLocator for SlowGeo {
            async fn lookup(&self, _ip: &str) -> SourceResult<GeoInfo> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                SourceResult::Found(GeoInfo::default())
            }
        }

        let mut mocks = Mocks::new();
        mocks.host_intel.expect_is_available().return_const(false);
        let mut sources = mocks.into_sources();
        sources.geo = Arc::new(SlowGeo);

        let exporter = ExportManager::new(std::env::temp_dir().join("osintkit-tests"));
        let orch = SearchOrchestrator::new(sources, Arc::new(MemoryHistoryStore::new()), exporter)
            .with_deadline(Some(Duration::from_secs(5)));

        let result = orch.search_ip("203.0.113.5").await;
        let findings = result.findings().unwrap();
        assert_eq!(findings.geolocation.error(), Some("Deadline of 5 seconds exceeded"));
        assert_eq!(findings.host_intel.error(), Some("Deadline of 5 seconds exceeded"));
    }
}
