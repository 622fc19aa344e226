//! Startup validation for coordination-service addresses and paths.

use std::net::IpAddr;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HOSTNAME: Regex = Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$"
    )
    .expect("hostname pattern is valid");
    static ref PATH_SEGMENT: Regex =
        Regex::new(r"^[a-zA-Z0-9_\-][a-zA-Z0-9_\-.]*$").expect("path segment pattern is valid");
}

/// Accepts RFC-1123 hostnames, IPv4 literals and bare IPv6 literals.
pub fn is_valid_hostname(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok() || HOSTNAME.is_match(host)
}

/// `host:port`, where an IPv6 host must be bracketed (`[::1]:2181`) and the port is 1..=65535.
pub fn is_valid_host_port(entry: &str) -> bool {
    let Some((host, port)) = entry.rsplit_once(':') else {
        return false;
    };

    let host = match host.strip_prefix('[') {
        Some(inner) => match inner.strip_suffix(']') {
            Some(v6) if v6.parse::<std::net::Ipv6Addr>().is_ok() => v6,
            _ => return false,
        },
        None if host.contains(':') => return false,
        None => host,
    };

    matches!(port.parse::<u16>(), Ok(p) if p > 0) && is_valid_hostname(host)
}

/// True when every entry is a valid `host:port`. An empty list is not valid.
pub fn is_valid_host_list(hosts: &[String]) -> bool {
    !hosts.is_empty() && hosts.iter().all(|h| is_valid_host_port(h))
}

/// Absolute, `/`-separated node path. `/` alone is the root and is valid;
/// a trailing slash or an empty segment is not.
pub fn is_valid_coordination_path(path: &str) -> bool {
    let mut parts = path.split('/');
    if parts.next() != Some("") {
        return false;
    }
    if path == "/" {
        return true;
    }
    let mut segments = parts.peekable();
    if segments.peek().is_none() {
        return false;
    }
    segments.all(|segment| PATH_SEGMENT.is_match(segment))
}
