use super::mac::find_mac;
use super::DeviceDetectionStrategy;
use crate::model::{Detection, Fingerprint};
use crate::tools::FingerprintRunner;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

/// Extract the OS description and MAC address from an nmap `-O` report.
///
/// `OS details:` wins over `Running:`; `MAC Address:` lines carry the
/// address followed by a vendor in parentheses.
pub fn parse_os_and_mac(output: &str) -> Fingerprint {
    let mut details = None;
    let mut running = None;
    let mut mac = None;

    for line in output.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("OS details:") {
            details = details.or_else(|| non_empty(rest));
        } else if let Some(rest) = line.strip_prefix("Running:") {
            running = running.or_else(|| non_empty(rest));
        } else if let Some(rest) = line.strip_prefix("MAC Address:") {
            mac = mac.or_else(|| find_mac(rest));
        }
    }

    Fingerprint {
        os: details.or(running),
        mac,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Fingerprint results for one enrichment batch, keyed by address.
///
/// Each address gets one cell that is initialised at most once, so the OS and
/// MAC strategies share a single tool run even when they race.
#[derive(Default)]
pub struct FingerprintCache {
    entries: Mutex<HashMap<Ipv4Addr, Arc<OnceCell<Option<Fingerprint>>>>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached fingerprint for `ip`, running the tool on first use.
    /// `None` means the tool was unavailable, failed or timed out.
    pub async fn get_or_run(
        &self,
        ip: Ipv4Addr,
        runner: &dyn FingerprintRunner,
    ) -> Option<Fingerprint> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(ip).or_default().clone()
        };

        cell.get_or_init(|| async move {
            match runner.fingerprint(ip).await {
                Ok(output) => Some(parse_os_and_mac(&output)),
                Err(e) => {
                    warn!("OS fingerprinting of {} unavailable: {}", ip, e);
                    None
                }
            }
        })
        .await
        .clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Operating system detection through the fingerprinting tool
pub struct OsFingerprintStrategy {
    runner: Arc<dyn FingerprintRunner>,
    cache: Arc<FingerprintCache>,
}

impl OsFingerprintStrategy {
    pub fn new(runner: Arc<dyn FingerprintRunner>, cache: Arc<FingerprintCache>) -> Self {
        Self { runner, cache }
    }

    /// OS and MAC from one (cached) fingerprinting run
    pub async fn resolve_os_and_mac(&self, ip: Ipv4Addr) -> Option<Fingerprint> {
        self.cache.get_or_run(ip, self.runner.as_ref()).await
    }

    pub async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
        let os = self.resolve_os_and_mac(ip).await.and_then(|fp| fp.os);
        debug!("OS for {}: {:?}", ip, os);
        os
    }
}

#[async_trait]
impl DeviceDetectionStrategy for OsFingerprintStrategy {
    fn name(&self) -> &'static str {
        "nmap OS fingerprint"
    }

    async fn detect(&self, ip: Ipv4Addr) -> Detection {
        Detection::Os(self.resolve(ip).await)
    }
}
