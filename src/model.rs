use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Enrichment result for one alive address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub ip: Ipv4Addr,
    /// Reverse DNS name, or the address itself when no name resolves
    pub hostname: String,
    pub mac: Option<String>,
    pub os: Option<String>,
    pub open_ports: BTreeSet<u16>,
}

impl HostRecord {
    /// A record carrying nothing but the address; every resolver that
    /// fails leaves its field in this state.
    pub fn bare(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            hostname: ip.to_string(),
            mac: None,
            os: None,
            open_ports: BTreeSet::new(),
        }
    }

    pub fn apply(&mut self, detection: Detection) {
        match detection {
            Detection::Hostname(name) => self.hostname = name,
            Detection::Mac(mac) => self.mac = mac,
            Detection::Os(os) => self.os = os,
            Detection::OpenPorts(ports) => self.open_ports = ports,
        }
    }
}

/// One field's worth of information produced by a detection strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Hostname(String),
    Mac(Option<String>),
    Os(Option<String>),
    OpenPorts(BTreeSet<u16>),
}

/// OS and MAC as read from a single fingerprinting run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub os: Option<String>,
    pub mac: Option<String>,
}

/// Records produced by one sweep and enrichment pass, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanBatch {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub hosts: Vec<HostRecord>,
}

/// History entry for one persisted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}
