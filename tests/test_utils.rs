#![allow(dead_code)]

use async_trait::async_trait;
use hostscout::tools::{
    ArpTableReader, FingerprintRunner, PingRunner, PortConnector, PortScanRunner, ReverseResolver,
};
use hostscout::{ScanConfig, ToolError, Toolkit};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn unavailable(tool: &str) -> ToolError {
    ToolError::Unavailable {
        tool: tool.to_string(),
    }
}

/// Answers for a fixed set of addresses and records every probe
#[derive(Default)]
pub struct FakePing {
    pub alive: HashSet<Ipv4Addr>,
    pub probed: Mutex<Vec<Ipv4Addr>>,
}

impl FakePing {
    pub fn answering(alive: &[&str]) -> Self {
        Self {
            alive: alive.iter().map(|s| ip(s)).collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<Ipv4Addr> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PingRunner for FakePing {
    async fn ping(&self, addr: Ipv4Addr) -> Result<(), ToolError> {
        self.probed.lock().unwrap().push(addr);
        if self.alive.contains(&addr) {
            Ok(())
        } else {
            Err(ToolError::Failed {
                tool: "ping".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }
}

/// Returns canned `arp` output, or behaves as if `arp` is missing
#[derive(Default)]
pub struct FakeArp {
    pub output: Option<String>,
}

#[async_trait]
impl ArpTableReader for FakeArp {
    async fn read_entry(&self, _ip: Ipv4Addr) -> Result<String, ToolError> {
        self.output.clone().ok_or_else(|| unavailable("arp"))
    }
}

/// Returns a canned `nmap -O` report and counts invocations
#[derive(Default)]
pub struct FakeFingerprint {
    pub output: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeFingerprint {
    pub fn reporting(output: &str) -> Self {
        Self {
            output: Some(output.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FingerprintRunner for FakeFingerprint {
    async fn fingerprint(&self, _ip: Ipv4Addr) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().ok_or_else(|| unavailable("nmap"))
    }
}

/// Returns a canned port-scan report and records the requested ports
#[derive(Default)]
pub struct FakePortScan {
    pub output: Option<String>,
    pub requested: Mutex<Vec<Vec<u16>>>,
}

impl FakePortScan {
    pub fn reporting(output: Option<&str>) -> Self {
        Self {
            output: output.map(str::to_string),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<Vec<u16>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PortScanRunner for FakePortScan {
    async fn scan_ports(&self, _ip: Ipv4Addr, ports: &[u16]) -> Result<String, ToolError> {
        self.requested.lock().unwrap().push(ports.to_vec());
        self.output.clone().ok_or_else(|| unavailable("nmap"))
    }
}

#[derive(Default)]
pub struct FakeResolver {
    pub names: HashMap<Ipv4Addr, String>,
}

#[async_trait]
impl ReverseResolver for FakeResolver {
    async fn reverse(&self, addr: Ipv4Addr) -> Option<String> {
        self.names.get(&addr).cloned()
    }
}

/// Reports a fixed set of ports as accepting connections
#[derive(Default)]
pub struct FakeConnector {
    pub open: HashSet<u16>,
    pub attempts: AtomicUsize,
}

impl FakeConnector {
    pub fn with_open(ports: &[u16]) -> Self {
        Self {
            open: ports.iter().copied().collect(),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PortConnector for FakeConnector {
    async fn is_open(&self, _ip: Ipv4Addr, port: u16) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.open.contains(&port)
    }
}

/// A toolkit where every collaborator is missing or silent
pub fn offline_toolkit() -> Toolkit {
    Toolkit {
        pinger: Arc::new(FakePing::default()),
        arp: Arc::new(FakeArp::default()),
        fingerprinter: Arc::new(FakeFingerprint::default()),
        port_scanner: Arc::new(FakePortScan::default()),
        resolver: Arc::new(FakeResolver::default()),
        connector: Arc::new(FakeConnector::default()),
    }
}

pub fn test_config() -> ScanConfig {
    ScanConfig::default()
}

pub const NMAP_OS_REPORT: &str = "\
Nmap scan report for 192.168.1.20
Host is up (0.00042s latency).
MAC Address: 00:11:22:33:44:55 (Vendor)
Device type: general purpose
Running: Linux 3.X
OS details: Linux 3.X
Network Distance: 1 hop
";

pub const NMAP_PORT_REPORT: &str = "\
Nmap scan report for 192.168.1.20
Host is up (0.00042s latency).
Not shown: 97 closed tcp ports (reset)
PORT    STATE SERVICE
22/tcp  open  ssh
80/tcp  open  http
443/tcp open  https
";
