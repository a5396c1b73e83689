use crate::constants::*;
use std::time::Duration;

/// How a single address is judged alive during the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// One echo request through the platform `ping` utility
    Icmp,
    /// A TCP connection attempt to one well-known port
    Tcp { port: u16 },
}

/// Configuration settings for network scanning operations
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Liveness check used by the sweep
    pub probe: ProbeStrategy,

    /// Reply timeout handed to the ping utility
    pub ping_timeout: Duration,

    /// Timeout for each TCP connection attempt (liveness and port fallback)
    pub tcp_connect_timeout: Duration,

    /// Deadline for one OS-fingerprinting run
    pub fingerprint_timeout: Duration,

    /// Deadline for one port-scanning run
    pub port_scan_timeout: Duration,

    /// Deadline for one address-resolution table query
    pub arp_timeout: Duration,

    /// Deadline for one reverse DNS lookup
    pub dns_timeout: Duration,

    /// Maximum number of liveness probes in flight
    pub probe_concurrency: usize,

    /// Maximum number of hosts enriched at once
    pub enrich_concurrency: usize,

    /// Maximum number of socket probes in flight for one host
    pub port_concurrency: usize,

    /// Candidate ports for the socket fallback
    pub top_ports: Vec<u16>,

    pub ping_program: String,
    pub arp_program: String,
    pub nmap_program: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe: ProbeStrategy::Icmp,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            tcp_connect_timeout: DEFAULT_TCP_CONNECT_TIMEOUT,
            fingerprint_timeout: DEFAULT_FINGERPRINT_TIMEOUT,
            port_scan_timeout: DEFAULT_PORT_SCAN_TIMEOUT,
            arp_timeout: DEFAULT_ARP_TIMEOUT,
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            enrich_concurrency: DEFAULT_ENRICH_CONCURRENCY,
            port_concurrency: DEFAULT_PORT_CONCURRENCY,
            top_ports: TOP_100_TCP_PORTS.to_vec(),
            ping_program: "ping".to_string(),
            arp_program: "arp".to_string(),
            nmap_program: "nmap".to_string(),
        }
    }
}
