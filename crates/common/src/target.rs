//! Target string classification.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(localhost|([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63})$").unwrap()
});

/// Kind of scan target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    #[serde(rename = "SINGLE_IPv4")]
    SingleIpv4,
    #[serde(rename = "SINGLE_IPv6")]
    SingleIpv6,
    #[serde(rename = "RANGE_IPv4")]
    RangeIpv4,
    #[serde(rename = "CIDR_IPv4")]
    CidrIpv4,
    #[serde(rename = "CIDR_IPv6")]
    CidrIpv6,
    #[serde(rename = "DOMAIN")]
    Domain,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetType::SingleIpv4 => "SINGLE_IPv4",
            TargetType::SingleIpv6 => "SINGLE_IPv6",
            TargetType::RangeIpv4 => "RANGE_IPv4",
            TargetType::CidrIpv4 => "CIDR_IPv4",
            TargetType::CidrIpv6 => "CIDR_IPv6",
            TargetType::Domain => "DOMAIN",
            TargetType::Http => "HTTP",
            TargetType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

impl TargetType {
    /// Classify a single target.
    pub fn classify(raw: &str) -> Self {
        let target = raw.trim();
        if target.is_empty() {
            return TargetType::Unknown;
        }

        if let Ok(ip) = target.parse::<IpAddr>() {
            return match ip {
                IpAddr::V4(_) => TargetType::SingleIpv4,
                IpAddr::V6(_) => TargetType::SingleIpv6,
            };
        }

        if let Some((start, end)) = target.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.parse::<Ipv4Addr>(), end.parse::<Ipv4Addr>()) {
                return if u32::from(start) <= u32::from(end) {
                    TargetType::RangeIpv4
                } else {
                    TargetType::Unknown
                };
            }
        }

        if let Some((addr, prefix)) = target.split_once('/') {
            if let Ok(prefix) = prefix.parse::<u8>() {
                if addr.parse::<Ipv4Addr>().is_ok() && prefix <= 32 {
                    return TargetType::CidrIpv4;
                }
                if addr.parse::<Ipv6Addr>().is_ok() && prefix <= 128 {
                    return TargetType::CidrIpv6;
                }
            }
        }

        let lower = target.to_ascii_lowercase();
        if let Some(rest) = lower
            .strip_prefix("http://")
            .or_else(|| lower.strip_prefix("https://"))
        {
            return if is_http_host(rest) {
                TargetType::Http
            } else {
                TargetType::Unknown
            };
        }

        if DOMAIN_PATTERN.is_match(target) {
            return TargetType::Domain;
        }

        TargetType::Unknown
    }

    /// Classify a comma-separated target list.
    ///
    /// Yields `Unknown` when the list is empty or any entry is unknown,
    /// otherwise the type of the first entry.
    pub fn classify_list(raw: &str) -> Self {
        let mut first = None;
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let kind = Self::classify(entry);
            if kind == TargetType::Unknown {
                return TargetType::Unknown;
            }
            first.get_or_insert(kind);
        }
        first.unwrap_or(TargetType::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TargetType::Unknown)
    }
}

fn is_http_host(rest: &str) -> bool {
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        match bracketed.split_once(']') {
            Some((host, _)) => return host.parse::<Ipv6Addr>().is_ok(),
            None => return false,
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => host,
            Some(_) => return false,
            None => authority,
        }
    };
    host.parse::<Ipv4Addr>().is_ok() || DOMAIN_PATTERN.is_match(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_addresses() {
        assert_eq!(TargetType::classify("192.168.1.1"), TargetType::SingleIpv4);
        assert_eq!(TargetType::classify("::1"), TargetType::SingleIpv6);
        assert_eq!(
            TargetType::classify("10.0.0.1-10.0.0.20"),
            TargetType::RangeIpv4
        );
        assert_eq!(TargetType::classify("10.0.0.0/24"), TargetType::CidrIpv4);
        assert_eq!(TargetType::classify("fe80::/64"), TargetType::CidrIpv6);
    }

    #[test]
    fn test_classify_names() {
        assert_eq!(TargetType::classify("owasp.org"), TargetType::Domain);
        assert_eq!(TargetType::classify("localhost"), TargetType::Domain);
        assert_eq!(
            TargetType::classify("https://owasp.org:8443/path?q=1"),
            TargetType::Http
        );
        assert_eq!(TargetType::classify("http://[::1]/"), TargetType::Http);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(TargetType::classify(""), TargetType::Unknown);
        assert_eq!(TargetType::classify("not a host"), TargetType::Unknown);
        assert_eq!(
            TargetType::classify("10.0.0.9-10.0.0.1"),
            TargetType::Unknown
        );
        assert_eq!(TargetType::classify("10.0.0.0/40"), TargetType::Unknown);
        assert_eq!(TargetType::classify("http://bad host"), TargetType::Unknown);
        assert_eq!(TargetType::classify("<script>"), TargetType::Unknown);
    }

    #[test]
    fn test_classify_list() {
        assert_eq!(
            TargetType::classify_list("owasp.org, 10.0.0.1"),
            TargetType::Domain
        );
        assert_eq!(
            TargetType::classify_list("owasp.org,???"),
            TargetType::Unknown
        );
        assert_eq!(TargetType::classify_list(" , "), TargetType::Unknown);
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&TargetType::SingleIpv4).unwrap();
        assert_eq!(json, format!("\"{}\"", TargetType::SingleIpv4));
    }
}
