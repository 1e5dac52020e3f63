//! Local and private network detection for registry hosts.
//!
//! Registries on loopback or private address space are usually development
//! registries that do not serve TLS, so they default to plain HTTP. The
//! classification is purely lexical and never resolves DNS.

use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

const PRIVATE_RANGES: [&str; 6] = [
    "10.0.0.0/8",
    "127.0.0.0/24",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
    "fc00::/7",
];

static PRIVATE_NETWORKS: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    PRIVATE_RANGES
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect()
});

/// Returns whether `name` refers to a local or private-network registry.
///
/// `name` is a registry host as it appears in a reference: a hostname, an
/// IPv4 literal, an IPv6 literal, each optionally followed by a port
/// (`[::1]:5000` for IPv6).
///
/// # Examples
///
/// ```
/// use libskiff::reference::is_local_registry;
///
/// assert!(is_local_registry("localhost:5000"));
/// assert!(is_local_registry("192.168.1.10"));
/// assert!(is_local_registry("[::1]:8080"));
/// assert!(!is_local_registry("ghcr.io"));
/// assert!(!is_local_registry("8.8.8.8"));
/// ```
pub fn is_local_registry(name: &str) -> bool {
    if is_localhost(name) || is_localdomain(name) {
        return true;
    }

    let name = match name.strip_prefix('[') {
        Some(rest) => match strip_bracketed_port(rest) {
            Some(inner) => inner,
            None => return false,
        },
        None => name,
    };

    match parse_ip_literal(name) {
        Some(ip) => PRIVATE_NETWORKS.iter().any(|net| net.contains(&ip)),
        None => false,
    }
}

/// `localhost` followed by a non-word character or nothing at all.
fn is_localhost(name: &str) -> bool {
    name.strip_prefix("localhost")
        .is_some_and(|rest| rest.chars().next().is_none_or(|c| !is_word_char(c)))
}

fn is_localdomain(name: &str) -> bool {
    let (host, _) = split_port(name);
    host.ends_with(".localdomain")
}

/// Takes `::1]:5000` (the opening bracket already removed) and returns `::1`.
fn strip_bracketed_port(rest: &str) -> Option<&str> {
    let (inner, port) = rest.rsplit_once("]:")?;
    if inner.is_empty() || port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(inner)
}

fn parse_ip_literal(name: &str) -> Option<IpAddr> {
    let (host, _) = split_port(name);
    if let Ok(ipv4) = host.parse::<Ipv4Addr>() {
        return Some(IpAddr::V4(ipv4));
    }

    name.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}

/// Splits a trailing `:<1-5 digits>` port off `name`.
fn split_port(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(':') {
        Some((host, port))
            if (1..=5).contains(&port.len()) && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            (host, Some(port))
        }
        _ => (name, None),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
