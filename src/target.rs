// src/target.rs
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::error::OsintError;

// Start-anchored only: anything after the first dotted domain part is accepted.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("email shape pattern")
});

static DOMAIN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]+(-[a-z0-9]+)*\.)+[a-z]{2,}$").expect("domain shape pattern")
});

/// Kind of target detected from a raw user-supplied string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Ip,
    Domain,
    Email,
    Unknown,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Ip => "ip",
            TargetType::Domain => "domain",
            TargetType::Email => "email",
            TargetType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = OsintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ip" => Ok(TargetType::Ip),
            "domain" => Ok(TargetType::Domain),
            "email" => Ok(TargetType::Email),
            "unknown" => Ok(TargetType::Unknown),
            other => Err(OsintError::InvalidInput(format!("Unknown target type: {}", other))),
        }
    }
}

/// Classify a raw target. Rules are applied in order, first match wins:
/// IP literal, email shape, domain shape, otherwise unknown.
pub fn classify(raw: &str) -> TargetType {
    let target = raw.trim();

    if is_ip(target) {
        return TargetType::Ip;
    }

    if EMAIL_SHAPE.is_match(target) {
        return TargetType::Email;
    }

    if is_domain(target) {
        return TargetType::Domain;
    }

    TargetType::Unknown
}

/// True when the string is an IPv4 or IPv6 address literal, without trimming
pub fn is_ip(target: &str) -> bool {
    IpAddr::from_str(target).is_ok()
}

/// True when the lowercased string is a dotted hostname ending in an alphabetic TLD.
/// Internationalized names and single-label hosts are rejected.
pub fn is_domain(target: &str) -> bool {
    DOMAIN_SHAPE.is_match(&target.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify("8.8.8.8"), TargetType::Ip);
        assert_eq!(classify("2001:db8::1"), TargetType::Ip);
        assert_eq!(classify("user@example.com"), TargetType::Email);
        assert_eq!(classify("example.com"), TargetType::Domain);
        assert_eq!(classify("not a target!!"), TargetType::Unknown);
    }

    #[test]
    fn test_classify_trims_whitespace() {
        assert_eq!(classify("  192.0.2.10\n"), TargetType::Ip);
        assert_eq!(classify("\tExample.ORG "), TargetType::Domain);
    }

    #[test]
    fn test_classify_is_idempotent() {
        for raw in ["8.8.8.8", "a@b.co", "sub.example.co.uk", "localhost", ""] {
            assert_eq!(classify(raw), classify(raw));
        }
    }

    #[test]
    fn test_ip_takes_priority() {
        // IPv6 literals contain no '@' or letters-only TLD but must win before the domain rule
        assert_eq!(classify("::1"), TargetType::Ip);
        assert_eq!(classify("::ffff:192.0.2.1"), TargetType::Ip);
    }

    #[test]
    fn test_email_shape_is_permissive() {
        assert_eq!(classify("weird local+tag@mail.example.com"), TargetType::Email);
        assert_eq!(classify("a@b.c@d"), TargetType::Email);
        assert_eq!(classify("user@localhost"), TargetType::Unknown);
    }

    #[test]
    fn test_domain_boundaries() {
        assert!(is_domain("my-site.example.com"));
        assert!(is_domain("EXAMPLE.COM"));
        assert!(!is_domain("localhost"));
        assert!(!is_domain("-bad.example.com"));
        assert!(!is_domain("bad-.example.com"));
        assert!(!is_domain("example.c0m"));
        assert!(!is_domain("bücher.de"));
        assert_eq!(classify("256.1.1.1"), TargetType::Unknown);
    }

    #[test]
    fn test_is_ip_does_not_trim() {
        assert!(is_ip("10.0.0.1"));
        assert!(!is_ip(" 10.0.0.1"));
        assert!(!is_ip("10.0.0"));
    }

    #[test]
    fn test_target_type_display_and_parse() {
        assert_eq!(TargetType::Ip.to_string(), "ip");
        assert_eq!("Domain".parse::<TargetType>().unwrap(), TargetType::Domain);
        assert!("host".parse::<TargetType>().is_err());
    }
}
