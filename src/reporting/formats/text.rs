// src/reporting/formats/text.rs
use crate::error::OsintResult;
use crate::osint::model::{
    DnsRecords, DomainFindings, DomainResult, EmailFindings, GeoInfo, HostIntel, IpFindings,
    ResultBody, SearchResult, SourceResult, TypedResult, WhoisInfo,
};
use crate::osint::sources::SUPPORTED_RECORD_TYPES;
use crate::reporting::format::{ExportFormat, ReportGenerator};

const INDENT: &str = "  ";
const MISSING: &str = "N/A";

/// Plain-text report: a header followed by one section per sub-result
#[derive(Debug, Default)]
pub struct TextReportGenerator;

impl TextReportGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for TextReportGenerator {
    fn render(&self, result: &SearchResult) -> OsintResult<String> {
        let mut out = TextWriter::default();

        out.line(0, "OSINT Search Results");
        out.line(0, "====================");
        out.field(0, "Target", Some(result.target()));
        out.field(0, "Type", Some(result.target_type().as_str()));

        match result {
            SearchResult::Unknown { error, .. } => out.field(0, "Error", Some(error)),
            SearchResult::Ip(r) => render_typed(&mut out, 0, r, render_ip),
            SearchResult::Domain(r) => render_typed(&mut out, 0, r, render_domain),
            SearchResult::Email(r) => render_typed(&mut out, 0, r, render_email),
        }

        Ok(out.finish())
    }

    fn supported_format(&self) -> ExportFormat {
        ExportFormat::Text
    }
}

#[derive(Default)]
struct TextWriter {
    buf: String,
}

impl TextWriter {
    fn line(&mut self, depth: usize, text: &str) {
        self.buf.push_str(&INDENT.repeat(depth));
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn section(&mut self, depth: usize, title: &str) {
        self.blank();
        self.line(depth, &format!("{}:", title));
    }

    fn field(&mut self, depth: usize, label: &str, value: Option<&str>) {
        self.line(depth, &format!("{}: {}", label, value.unwrap_or(MISSING)));
    }

    fn number(&mut self, depth: usize, label: &str, value: Option<f64>) {
        let value = value.map(|v| v.to_string());
        self.field(depth, label, value.as_deref());
    }

    fn flag(&mut self, depth: usize, label: &str, value: bool) {
        self.field(depth, label, Some(if value { "Yes" } else { "No" }));
    }

    fn list<T: ToString>(&mut self, depth: usize, label: &str, items: &[T]) {
        let joined = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        let value = if joined.is_empty() { "None" } else { joined.as_str() };
        self.field(depth, label, Some(value));
    }

    fn finish(self) -> String {
        self.buf
    }
}

fn render_typed<F>(
    out: &mut TextWriter,
    depth: usize,
    result: &TypedResult<F>,
    findings: fn(&mut TextWriter, usize, &F),
) {
    out.field(depth, "Timestamp", Some(&result.timestamp));

    match &result.body {
        ResultBody::Rejected { error } => out.field(depth, "Error", Some(error)),
        ResultBody::Completed { execution_time, findings: f } => {
            out.field(depth, "Execution Time", Some(&format!("{} seconds", execution_time)));
            findings(out, depth, f);
        }
    }
}

/// Section body for a source result, or its error line
fn render_source<T>(out: &mut TextWriter, depth: usize, title: &str, result: &SourceResult<T>, body: fn(&mut TextWriter, usize, &T)) {
    out.section(depth, title);
    match result {
        SourceResult::Found(value) => body(out, depth + 1, value),
        SourceResult::Failed { error } => out.field(depth + 1, "Error", Some(error)),
    }
}

fn render_ip(out: &mut TextWriter, depth: usize, findings: &IpFindings) {
    render_source(out, depth, "Geolocation", &findings.geolocation, render_geo);
    render_source(out, depth, "Host Intelligence", &findings.host_intel, render_host);
}

fn render_geo(out: &mut TextWriter, depth: usize, geo: &GeoInfo) {
    out.field(depth, "IP", geo.ip.as_deref());
    out.field(depth, "City", geo.city.as_deref());
    out.field(depth, "Region", geo.region.as_deref());
    out.field(depth, "Country", geo.country.as_deref());
    out.field(depth, "Postal Code", geo.postal.as_deref());
    out.number(depth, "Latitude", geo.latitude);
    out.number(depth, "Longitude", geo.longitude);
    out.field(depth, "ASN", geo.asn.as_deref());
    out.field(depth, "Organization", geo.org.as_deref());
    out.field(depth, "Timezone", geo.timezone.as_deref());
}

fn render_host(out: &mut TextWriter, depth: usize, host: &HostIntel) {
    out.field(depth, "IP", Some(&host.ip));
    out.list(depth, "Hostnames", &host.hostnames);
    out.field(depth, "Country", host.country.as_deref());
    out.field(depth, "City", host.city.as_deref());
    out.field(depth, "Organization", host.org.as_deref());
    out.field(depth, "ISP", host.isp.as_deref());
    out.field(depth, "ASN", host.asn.as_deref());
    out.field(depth, "Operating System", host.os.as_deref());
    out.list(depth, "Open Ports", &host.ports);
    out.list(depth, "Vulnerabilities", &host.vulns);
    out.field(depth, "Last Update", host.last_update.as_deref());
    out.list(depth, "Tags", &host.tags);
}

fn render_domain(out: &mut TextWriter, depth: usize, findings: &DomainFindings) {
    render_source(out, depth, "WHOIS", &findings.whois, render_whois);
    render_dns(out, depth, &findings.dns);

    out.blank();
    out.field(depth, "Resolved IP", findings.ip.as_deref());
    if let Some(geo) = &findings.geolocation {
        render_source(out, depth, "Geolocation", geo, render_geo);
    }
}

fn render_whois(out: &mut TextWriter, depth: usize, whois: &WhoisInfo) {
    out.field(depth, "Domain", Some(&whois.domain));
    out.field(depth, "Registrar", whois.registrar.as_deref());
    out.field(depth, "Creation Date", whois.creation_date.as_deref());
    out.field(depth, "Expiration Date", whois.expiration_date.as_deref());
    out.field(depth, "Updated Date", whois.updated_date.as_deref());
    out.list(depth, "Name Servers", &whois.name_servers);
    out.list(depth, "Status", &whois.status);
    out.list(depth, "Emails", &whois.emails);
    out.field(depth, "DNSSEC", whois.dnssec.as_deref());
    out.line(depth, "Registrant:");
    out.field(depth + 1, "Name", whois.registrant.name.as_deref());
    out.field(depth + 1, "Organization", whois.registrant.organization.as_deref());
    out.field(depth + 1, "Country", whois.registrant.country.as_deref());
    out.field(depth, "WHOIS Server", whois.whois_server.as_deref());
}

fn render_dns(out: &mut TextWriter, depth: usize, dns: &DnsRecords) {
    out.section(depth, "DNS Records");
    if dns.is_empty() {
        out.line(depth + 1, "None");
        return;
    }

    let known = SUPPORTED_RECORD_TYPES.iter().filter_map(|t| dns.get(*t));
    let extra = dns
        .iter()
        .filter(|(t, _)| !SUPPORTED_RECORD_TYPES.contains(&t.as_str()))
        .map(|(_, answer)| answer);

    for answer in known.chain(extra) {
        match (answer.records(), answer.error()) {
            (Some(records), _) => out.list(depth + 1, &answer.record_type, records),
            (None, error) => out.field(depth + 1, &answer.record_type, Some(&format!("Error: {}", error.unwrap_or(MISSING)))),
        }
    }
}

fn render_email(out: &mut TextWriter, depth: usize, findings: &EmailFindings) {
    let v = &findings.verification;
    out.section(depth, "Email Verification");
    out.field(depth + 1, "Email", Some(&v.email));
    out.flag(depth + 1, "Format Valid", v.format_valid);
    out.flag(depth + 1, "Domain Exists", v.domain_exists);
    out.flag(depth + 1, "Has MX Records", v.has_mx_records);

    match &findings.domain_info {
        Some(domain) => render_domain_info(out, depth, domain),
        None => {
            out.blank();
            out.field(depth, "Domain Information", None);
        }
    }
}

fn render_domain_info(out: &mut TextWriter, depth: usize, domain: &DomainResult) {
    out.section(depth, "Domain Information");
    out.field(depth + 1, "Target", Some(&domain.target));
    render_typed(out, depth + 1, domain, render_domain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osint::model::{DnsAnswer, DnsRecord, EmailVerification, IpResult, EmailResult};

    fn ip_result() -> SearchResult {
        SearchResult::Ip(IpResult::completed(
            "203.0.113.5",
            "2024-03-01 10:00:00".to_string(),
            0.25,
            IpFindings {
                geolocation: SourceResult::Found(GeoInfo {
                    city: Some("Testville".to_string()),
                    latitude: Some(12.5),
                    ..Default::default()
                }),
                host_intel: SourceResult::failed("Shodan API not available"),
            },
        ))
    }

    #[test]
    fn test_ip_report() {
        let text = TextReportGenerator::new().render(&ip_result()).unwrap();

        assert!(text.contains("Target: 203.0.113.5"));
        assert!(text.contains("Type: ip"));
        assert!(text.contains("Timestamp: 2024-03-01 10:00:00"));
        assert!(text.contains("Execution Time: 0.25 seconds"));
        assert!(text.contains("\nGeolocation:\n  IP: N/A\n  City: Testville\n"));
        assert!(text.contains("  Latitude: 12.5\n"));
        assert!(text.contains("Host Intelligence:\n  Error: Shodan API not available"));
    }

    #[test]
    fn test_domain_report_lists_and_dns() {
        let mut dns = DnsRecords::new();
        dns.insert("MX".to_string(), DnsAnswer::failed("example.com", "MX", "timeout"));
        dns.insert("A".to_string(), DnsAnswer::found("example.com", "A", vec![
            DnsRecord::Value("192.0.2.1".to_string()),
            DnsRecord::Value("192.0.2.2".to_string()),
        ]));

        let result = SearchResult::Domain(DomainResult::completed(
            "example.com",
            "2024-03-01 10:00:00".to_string(),
            1.0,
            DomainFindings {
                whois: SourceResult::Found(WhoisInfo {
                    domain: "example.com".to_string(),
                    name_servers: vec!["a.iana-servers.net".to_string(), "b.iana-servers.net".to_string()],
                    ..Default::default()
                }),
                dns,
                ip: None,
                geolocation: None,
            },
        ));

        let text = TextReportGenerator::new().render(&result).unwrap();
        assert!(text.contains("Name Servers: a.iana-servers.net, b.iana-servers.net"));
        assert!(text.contains("Status: None"));
        assert!(text.contains("    Name: N/A"));
        assert!(text.contains("  A: 192.0.2.1, 192.0.2.2"));
        assert!(text.contains("  MX: Error: timeout"));
        assert!(text.contains("Resolved IP: N/A"));
        assert!(!text.contains("\nGeolocation:"));
        // A is rendered before MX regardless of map order
        assert!(text.find("  A: ").unwrap() < text.find("  MX: ").unwrap());
    }

    #[test]
    fn test_email_report_without_domain_info() {
        let result = SearchResult::Email(EmailResult::completed(
            "bob@example.invalid",
            "2024-03-01 10:00:00".to_string(),
            0.1,
            EmailFindings {
                verification: EmailVerification {
                    email: "bob@example.invalid".to_string(),
                    format_valid: true,
                    domain_exists: false,
                    has_mx_records: false,
                },
                domain_info: None,
            },
        ));

        let text = TextReportGenerator::new().render(&result).unwrap();
        assert!(text.contains("  Format Valid: Yes"));
        assert!(text.contains("  Domain Exists: No"));
        assert!(text.contains("Domain Information: N/A"));
    }

    #[test]
    fn test_rejected_and_unknown_reports() {
        let rejected = SearchResult::Ip(IpResult::rejected(" 8.8.8.8", "2024-03-01 10:00:00".to_string(), "Invalid IP address format"));
        let text = TextReportGenerator::new().render(&rejected).unwrap();
        assert!(text.contains("Error: Invalid IP address format"));
        assert!(!text.contains("Execution Time"));

        let text = TextReportGenerator::new().render(&SearchResult::unknown("???")).unwrap();
        assert!(text.contains("Type: unknown"));
        assert!(text.contains("Error: Unknown target type"));
    }
}
