//! Boundary adapters for everything outside the process: the ping, arp and
//! nmap utilities, reverse DNS, and raw TCP connects.
//!
//! Each collaborator sits behind its own trait so the coordinators and the
//! output parsers can be exercised without touching the network.

use crate::config::{ProbeStrategy, ScanConfig};
use crate::constants::PROCESS_GRACE;
use crate::errors::ToolError;
use async_trait::async_trait;
use dns_lookup::lookup_addr;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Run an external program to completion and return its stdout.
///
/// The child is killed if `deadline` passes first.
pub async fn run_tool(program: &str, args: &[&str], deadline: Duration) -> Result<String, ToolError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = match timeout(deadline, command.output()).await {
        Err(_) => {
            return Err(ToolError::Timeout {
                tool: program.to_string(),
                after: deadline,
            })
        }
        Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
            return Err(ToolError::Unavailable {
                tool: program.to_string(),
            })
        }
        Ok(Err(e)) => {
            return Err(ToolError::Io {
                tool: program.to_string(),
                source: e,
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: program.to_string(),
            status: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Liveness check for one address
#[async_trait]
pub trait PingRunner: Send + Sync {
    async fn ping(&self, ip: Ipv4Addr) -> Result<(), ToolError>;
}

/// Reads the local address-resolution table entry for one address
#[async_trait]
pub trait ArpTableReader: Send + Sync {
    async fn read_entry(&self, ip: Ipv4Addr) -> Result<String, ToolError>;
}

/// Runs OS fingerprinting against one address and returns the raw report
#[async_trait]
pub trait FingerprintRunner: Send + Sync {
    async fn fingerprint(&self, ip: Ipv4Addr) -> Result<String, ToolError>;
}

/// Runs a TCP port scan over exactly `ports`, reporting open ports only
#[async_trait]
pub trait PortScanRunner: Send + Sync {
    async fn scan_ports(&self, ip: Ipv4Addr, ports: &[u16]) -> Result<String, ToolError>;
}

/// Reverse DNS
#[async_trait]
pub trait ReverseResolver: Send + Sync {
    async fn reverse(&self, ip: Ipv4Addr) -> Option<String>;
}

/// Single TCP connection attempt, used by the port-scan fallback
#[async_trait]
pub trait PortConnector: Send + Sync {
    async fn is_open(&self, ip: Ipv4Addr, port: u16) -> bool;
}

/// The platform `ping` utility, one echo request
pub struct SystemPing {
    program: String,
    reply_timeout: Duration,
}

impl SystemPing {
    pub fn new(program: impl Into<String>, reply_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            reply_timeout,
        }
    }

    fn args(&self, ip: &str) -> Vec<String> {
        let millis = self.reply_timeout.as_millis().max(1).to_string();
        if cfg!(target_os = "windows") {
            vec!["-n".into(), "1".into(), "-w".into(), millis, ip.into()]
        } else if cfg!(target_os = "macos") {
            vec!["-c".into(), "1".into(), "-W".into(), millis, ip.into()]
        } else {
            let secs = self.reply_timeout.as_secs().max(1).to_string();
            vec!["-c".into(), "1".into(), "-W".into(), secs, ip.into()]
        }
    }
}

#[async_trait]
impl PingRunner for SystemPing {
    async fn ping(&self, ip: Ipv4Addr) -> Result<(), ToolError> {
        let args = self.args(&ip.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_tool(&self.program, &args, self.reply_timeout + PROCESS_GRACE)
            .await
            .map(|_| ())
    }
}

/// Liveness by TCP connect to a single port.
///
/// A refused connection still proves the host answered, so it counts as alive.
pub struct TcpPing {
    port: u16,
    connect_timeout: Duration,
}

impl TcpPing {
    pub fn new(port: u16, connect_timeout: Duration) -> Self {
        Self {
            port,
            connect_timeout,
        }
    }
}

#[async_trait]
impl PingRunner for TcpPing {
    async fn ping(&self, ip: Ipv4Addr) -> Result<(), ToolError> {
        let tool = format!("tcp/{}", self.port);
        match timeout(self.connect_timeout, TcpStream::connect((ip, self.port))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => Ok(()),
            Ok(Err(e)) => Err(ToolError::Failed {
                tool,
                status: e.to_string(),
            }),
            Err(_) => Err(ToolError::Timeout {
                tool,
                after: self.connect_timeout,
            }),
        }
    }
}

/// The `arp` utility, queried for a single address
pub struct SystemArp {
    program: String,
    deadline: Duration,
}

impl SystemArp {
    pub fn new(program: impl Into<String>, deadline: Duration) -> Self {
        Self {
            program: program.into(),
            deadline,
        }
    }
}

#[async_trait]
impl ArpTableReader for SystemArp {
    async fn read_entry(&self, ip: Ipv4Addr) -> Result<String, ToolError> {
        let ip = ip.to_string();
        let flag = if cfg!(target_os = "windows") { "-a" } else { "-n" };
        run_tool(&self.program, &[flag, &ip], self.deadline).await
    }
}

/// `nmap -O` against one address
pub struct NmapFingerprint {
    program: String,
    deadline: Duration,
}

impl NmapFingerprint {
    pub fn new(program: impl Into<String>, deadline: Duration) -> Self {
        Self {
            program: program.into(),
            deadline,
        }
    }
}

#[async_trait]
impl FingerprintRunner for NmapFingerprint {
    async fn fingerprint(&self, ip: Ipv4Addr) -> Result<String, ToolError> {
        let ip = ip.to_string();
        run_tool(&self.program, &["-O", "-Pn", "-n", &ip], self.deadline).await
    }
}

/// `nmap -p <ports> --open` against one address
pub struct NmapPortScan {
    program: String,
    deadline: Duration,
}

impl NmapPortScan {
    pub fn new(program: impl Into<String>, deadline: Duration) -> Self {
        Self {
            program: program.into(),
            deadline,
        }
    }
}

#[async_trait]
impl PortScanRunner for NmapPortScan {
    async fn scan_ports(&self, ip: Ipv4Addr, ports: &[u16]) -> Result<String, ToolError> {
        let ip = ip.to_string();
        let ports = join_ports(ports);
        run_tool(
            &self.program,
            &["-p", &ports, "--open", "-Pn", "-n", &ip],
            self.deadline,
        )
        .await
    }
}

/// Comma-separated list in nmap's `-p` syntax
pub fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Reverse lookup through the system resolver on a blocking thread
pub struct DnsLookupResolver {
    deadline: Duration,
}

impl DnsLookupResolver {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

#[async_trait]
impl ReverseResolver for DnsLookupResolver {
    async fn reverse(&self, ip: Ipv4Addr) -> Option<String> {
        let lookup = tokio::task::spawn_blocking(move || lookup_addr(&IpAddr::V4(ip)));
        match timeout(self.deadline, lookup).await {
            Ok(Ok(Ok(name))) if name != ip.to_string() => Some(name),
            Ok(Ok(Ok(_))) => None,
            Ok(Ok(Err(e))) => {
                debug!("reverse lookup for {} failed: {}", ip, e);
                None
            }
            Ok(Err(e)) => {
                debug!("reverse lookup worker for {} failed: {}", ip, e);
                None
            }
            Err(_) => {
                debug!("reverse lookup for {} timed out", ip);
                None
            }
        }
    }
}

/// Plain `connect()` with a timeout
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl PortConnector for TcpConnector {
    async fn is_open(&self, ip: Ipv4Addr, port: u16) -> bool {
        matches!(
            timeout(self.connect_timeout, TcpStream::connect((ip, port))).await,
            Ok(Ok(_))
        )
    }
}

/// Every external collaborator the sweep and enrichment stages depend on
#[derive(Clone)]
pub struct Toolkit {
    pub pinger: Arc<dyn PingRunner>,
    pub arp: Arc<dyn ArpTableReader>,
    pub fingerprinter: Arc<dyn FingerprintRunner>,
    pub port_scanner: Arc<dyn PortScanRunner>,
    pub resolver: Arc<dyn ReverseResolver>,
    pub connector: Arc<dyn PortConnector>,
}

impl Toolkit {
    /// The real subprocess- and socket-backed collaborators
    pub fn system(config: &ScanConfig) -> Self {
        let pinger: Arc<dyn PingRunner> = match config.probe {
            ProbeStrategy::Icmp => Arc::new(SystemPing::new(
                config.ping_program.clone(),
                config.ping_timeout,
            )),
            ProbeStrategy::Tcp { port } => Arc::new(TcpPing::new(port, config.tcp_connect_timeout)),
        };

        Self {
            pinger,
            arp: Arc::new(SystemArp::new(config.arp_program.clone(), config.arp_timeout)),
            fingerprinter: Arc::new(NmapFingerprint::new(
                config.nmap_program.clone(),
                config.fingerprint_timeout,
            )),
            port_scanner: Arc::new(NmapPortScan::new(
                config.nmap_program.clone(),
                config.port_scan_timeout,
            )),
            resolver: Arc::new(DnsLookupResolver::new(config.dns_timeout)),
            connector: Arc::new(TcpConnector::new(config.tcp_connect_timeout)),
        }
    }
}
