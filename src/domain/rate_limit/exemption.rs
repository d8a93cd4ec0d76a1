//! Which clients bypass rate limiting.
//!
//! Exemptions only exist to make local and staging testing painless; in
//! production every client is limited.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::config::Environment;

/// Decides whether a client identifier skips rate limiting entirely.
#[derive(Debug, Clone, Copy)]
pub struct ExemptionPolicy {
    environment: Environment,
}

impl ExemptionPolicy {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns true if the client should not be limited.
    ///
    /// Always false in production. Elsewhere, loopback, RFC 1918, IPv6
    /// unique-local, and the `"unknown"` placeholder are exempt.
    pub fn is_exempt(&self, client_id: &str) -> bool {
        if self.environment.is_production() {
            return false;
        }
        is_trusted_identifier(client_id)
    }
}

fn is_trusted_identifier(client_id: &str) -> bool {
    let normalized = normalize(client_id);
    match normalized.as_str() {
        "unknown" | "localhost" => return true,
        _ => {}
    }

    match normalized.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_trusted_v4(ip),
        Ok(IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
            Some(mapped) => is_trusted_v4(mapped),
            None => is_trusted_v6(ip),
        },
        Err(_) => false,
    }
}

/// Trim, lowercase, and strip `[...]` around IPv6 literals.
fn normalize(client_id: &str) -> String {
    let lowered = client_id.trim().to_ascii_lowercase();
    match lowered.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => inner.to_string(),
        None => lowered,
    }
}

fn is_trusted_v4(ip: Ipv4Addr) -> bool {
    // is_private covers 10/8, 172.16/12 and 192.168/16
    ip == Ipv4Addr::LOCALHOST || ip.is_private()
}

fn is_trusted_v6(ip: Ipv6Addr) -> bool {
    // fc00::/7 unique-local
    ip.is_loopback() || (ip.segments()[0] & 0xfe00) == 0xfc00
}
