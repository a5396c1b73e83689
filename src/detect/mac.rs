use super::os::OsFingerprintStrategy;
use super::DeviceDetectionStrategy;
use crate::model::Detection;
use crate::tools::ArpTableReader;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

/// Find the first six-octet hardware address in `text`.
///
/// Octets are hex, delimited by `:` or `-` (one delimiter per address).
/// Single-digit octets, as printed by BSD `arp`, are zero-padded.
pub fn find_mac(text: &str) -> Option<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ',' | ';'))
        .find_map(parse_mac_token)
}

fn parse_mac_token(token: &str) -> Option<String> {
    let delimiter = if token.contains(':') {
        ':'
    } else if token.contains('-') {
        '-'
    } else {
        return None;
    };

    let octets: Vec<&str> = token.split(delimiter).collect();
    if octets.len() != 6 {
        return None;
    }
    if !octets
        .iter()
        .all(|o| (1..=2).contains(&o.len()) && o.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return None;
    }

    let padded: Vec<String> = octets.iter().map(|o| format!("{:0>2}", o)).collect();
    Some(padded.join(&delimiter.to_string()))
}

/// The hardware address listed for `ip` in `arp` output, if any.
///
/// Only lines naming the address as a whole token (optionally in
/// parentheses) are considered, so `10.0.0.1` never matches `10.0.0.12`.
pub fn parse_arp_entry(output: &str, ip: Ipv4Addr) -> Option<String> {
    let wanted = ip.to_string();
    output
        .lines()
        .filter(|line| {
            line.split_whitespace()
                .any(|token| token.trim_matches(|c| c == '(' || c == ')') == wanted)
        })
        .find_map(find_mac)
}

/// MAC address resolution: fingerprinting side channel first, then the
/// local address-resolution table.
pub struct MacAddressStrategy {
    fingerprint: Arc<OsFingerprintStrategy>,
    arp: Arc<dyn ArpTableReader>,
}

impl MacAddressStrategy {
    pub fn new(fingerprint: Arc<OsFingerprintStrategy>, arp: Arc<dyn ArpTableReader>) -> Self {
        Self { fingerprint, arp }
    }

    pub async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
        if let Some(mac) = self
            .fingerprint
            .resolve_os_and_mac(ip)
            .await
            .and_then(|fp| fp.mac)
        {
            return Some(mac);
        }
        self.from_arp_table(ip).await
    }

    pub async fn from_arp_table(&self, ip: Ipv4Addr) -> Option<String> {
        match self.arp.read_entry(ip).await {
            Ok(output) => parse_arp_entry(&output, ip),
            Err(e) => {
                debug!("ARP table lookup for {} failed: {}", ip, e);
                None
            }
        }
    }
}

#[async_trait]
impl DeviceDetectionStrategy for MacAddressStrategy {
    fn name(&self) -> &'static str {
        "MAC address via fingerprint or ARP table"
    }

    async fn detect(&self, ip: Ipv4Addr) -> Detection {
        Detection::Mac(self.resolve(ip).await)
    }
}
