// src/osint/sources/email.rs
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{DnsLookup, HostResolver};
use crate::osint::model::EmailVerification;

static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Checks an address in increasing cost: format, domain resolution, then MX records
#[derive(Clone)]
pub struct EmailVerifier {
    resolver: Arc<dyn HostResolver>,
    dns: Arc<dyn DnsLookup>,
}

impl EmailVerifier {
    pub fn new(resolver: Arc<dyn HostResolver>, dns: Arc<dyn DnsLookup>) -> Self {
        Self { resolver, dns }
    }

    pub fn validate_format(email: &str) -> bool {
        EMAIL_FORMAT.is_match(email)
    }

    /// Everything after the first `@`
    pub fn email_domain(email: &str) -> Option<&str> {
        email.split_once('@').map(|(_, domain)| domain)
    }

    pub async fn verify(&self, email: &str) -> EmailVerification {
        let mut verification = EmailVerification {
            email: email.to_string(),
            ..Default::default()
        };

        verification.format_valid = Self::validate_format(email);
        if !verification.format_valid {
            return verification;
        }

        let Some(domain) = Self::email_domain(email) else {
            return verification;
        };

        match self.resolver.resolve(domain).await {
            Ok(ip) => {
                debug!("Mail domain {} resolves to {}", domain, ip);
                verification.domain_exists = true;
            }
            Err(e) => {
                warn!("Mail domain {} does not resolve: {}", domain, e);
                return verification;
            }
        }

        let mx = self.dns.lookup(domain, "MX").await;
        verification.has_mx_records = mx.records().map_or(false, |records| !records.is_empty());

        verification
    }
}
