use super::DeviceDetectionStrategy;
use crate::config::ScanConfig;
use crate::executor::run_bounded;
use crate::model::Detection;
use crate::tools::{PortConnector, PortScanRunner};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Open TCP ports listed in nmap's normal output (`22/tcp open ssh`)
pub fn parse_open_ports(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let port = fields.next()?.strip_suffix("/tcp")?.parse::<u16>().ok()?;
            (fields.next()? == "open").then_some(port)
        })
        .collect()
}

/// Port enumeration over the configured candidates: one nmap run, or direct
/// connects when nmap is missing
pub struct PortScanStrategy {
    scanner: Arc<dyn PortScanRunner>,
    connector: Arc<dyn PortConnector>,
    candidates: Vec<u16>,
    concurrency: usize,
}

impl PortScanStrategy {
    pub fn new(
        config: &ScanConfig,
        scanner: Arc<dyn PortScanRunner>,
        connector: Arc<dyn PortConnector>,
    ) -> Self {
        Self {
            scanner,
            connector,
            candidates: config.top_ports.clone(),
            concurrency: config.port_concurrency,
        }
    }

    pub async fn resolve(&self, ip: Ipv4Addr) -> BTreeSet<u16> {
        match self.scanner.scan_ports(ip, &self.candidates).await {
            Ok(output) => parse_open_ports(&output)
                .into_iter()
                .filter(|port| self.candidates.contains(port))
                .collect(),
            Err(e) => {
                warn!("port scanner unavailable for {} ({}), probing sockets", ip, e);
                self.connect_scan(ip).await
            }
        }
    }

    /// Connect to each candidate port, `concurrency` at a time
    pub async fn connect_scan(&self, ip: Ipv4Addr) -> BTreeSet<u16> {
        let connector = self.connector.as_ref();
        let open: BTreeSet<u16> = run_bounded(
            self.candidates.iter().copied(),
            self.concurrency,
            |port| async move { connector.is_open(ip, port).await.then_some(port) },
        )
        .await
        .into_iter()
        .flatten()
        .collect();
        debug!("{} open ports on {} by direct connect", open.len(), ip);
        open
    }
}

#[async_trait]
impl DeviceDetectionStrategy for PortScanStrategy {
    fn name(&self) -> &'static str {
        "nmap port scan with socket fallback"
    }

    async fn detect(&self, ip: Ipv4Addr) -> Detection {
        Detection::OpenPorts(self.resolve(ip).await)
    }
}
