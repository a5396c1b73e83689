use crate::config::ScanConfig;
use crate::detect::{
    hostname::ReverseDnsStrategy, mac::MacAddressStrategy, os::FingerprintCache,
    os::OsFingerprintStrategy, port::PortScanStrategy, DeviceDetectionStrategy,
};
use crate::errors::NetworkDiscoveryError;
use crate::executor::run_bounded;
use crate::model::HostRecord;
use crate::net::ping;
use crate::tools::Toolkit;
use futures::future::join_all;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Main network discovery engine: the sweep, then enrichment of every
/// alive host
pub struct NetworkDiscovery {
    config: ScanConfig,
    toolkit: Toolkit,
}

impl NetworkDiscovery {
    /// Engine backed by the real ping, arp and nmap utilities
    pub fn new(config: ScanConfig) -> Self {
        let toolkit = Toolkit::system(&config);
        Self { config, toolkit }
    }

    pub fn with_toolkit(config: ScanConfig, toolkit: Toolkit) -> Self {
        Self { config, toolkit }
    }

    /// Set the maximum number of concurrent liveness probes
    pub fn set_concurrency(&mut self, jobs: usize) {
        self.config.probe_concurrency = jobs.max(1);
    }

    /// Set the maximum number of hosts enriched at once
    pub fn set_enrich_concurrency(&mut self, jobs: usize) {
        self.config.enrich_concurrency = jobs.max(1);
    }

    pub async fn is_alive(&self, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        ping::is_alive(self.toolkit.pinger.as_ref(), ip).await
    }

    /// Alive hosts of `subnet_spec`, in address order
    pub async fn scan_subnet(&self, subnet_spec: &str) -> Result<Vec<Ipv4Addr>, NetworkDiscoveryError> {
        ping::scan_subnet(subnet_spec, self.toolkit.pinger.as_ref(), &self.config).await
    }

    /// Enrichment stage for one batch, with its own fingerprint cache
    pub fn enricher(&self) -> BatchEnricher {
        BatchEnricher::new(&self.config, &self.toolkit)
    }

    pub async fn enrich_host(&self, ip: Ipv4Addr) -> HostRecord {
        self.enricher().enrich_host(ip).await
    }

    pub async fn enrich_all(&self, ips: &[Ipv4Addr]) -> Vec<HostRecord> {
        self.enricher().enrich_all(ips).await
    }

    /// Sweep `subnet_spec` and enrich every host that answered
    pub async fn discover(&self, subnet_spec: &str) -> Result<Vec<HostRecord>, NetworkDiscoveryError> {
        let scan_start = Instant::now();
        let alive = self.scan_subnet(subnet_spec).await?;
        let hosts = self.enrich_all(&alive).await;
        info!(
            "Discovery of {} finished in {:.2}s ({} hosts)",
            subnet_spec,
            scan_start.elapsed().as_secs_f64(),
            hosts.len()
        );
        Ok(hosts)
    }
}

/// Runs every detection strategy for a set of hosts.
///
/// The fingerprint cache lives exactly as long as this value, so results
/// never leak from one batch into the next.
pub struct BatchEnricher {
    strategies: Vec<Arc<dyn DeviceDetectionStrategy>>,
    cache: Arc<FingerprintCache>,
    concurrency: usize,
}

impl BatchEnricher {
    pub fn new(config: &ScanConfig, toolkit: &Toolkit) -> Self {
        let cache = Arc::new(FingerprintCache::new());
        let os = Arc::new(OsFingerprintStrategy::new(
            toolkit.fingerprinter.clone(),
            cache.clone(),
        ));

        let strategies: Vec<Arc<dyn DeviceDetectionStrategy>> = vec![
            Arc::new(ReverseDnsStrategy::new(toolkit.resolver.clone())),
            os.clone(),
            Arc::new(MacAddressStrategy::new(os, toolkit.arp.clone())),
            Arc::new(PortScanStrategy::new(
                config,
                toolkit.port_scanner.clone(),
                toolkit.connector.clone(),
            )),
        ];

        Self {
            strategies,
            cache,
            concurrency: config.enrich_concurrency,
        }
    }

    /// All strategies run concurrently; each fills one field of the record.
    pub async fn enrich_host(&self, ip: Ipv4Addr) -> HostRecord {
        let detections = join_all(self.strategies.iter().map(|s| s.detect(ip))).await;

        let mut record = HostRecord::bare(ip);
        for (strategy, detection) in self.strategies.iter().zip(detections) {
            debug!("{} for {}: {:?}", strategy.name(), ip, detection);
            record.apply(detection);
        }
        record
    }

    /// One record per input address, in input order
    pub async fn enrich_all(&self, ips: &[Ipv4Addr]) -> Vec<HostRecord> {
        info!(
            "Enriching {} hosts ({} at a time)",
            ips.len(),
            self.concurrency
        );
        run_bounded(ips.iter().copied(), self.concurrency, |ip| self.enrich_host(ip)).await
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }
}
