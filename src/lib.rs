//! hostscout - local IPv4 subnet discovery
//!
//! This library provides:
//! - Liveness sweeps over a CIDR subnet with bounded parallelism
//! - Per-host enrichment: reverse DNS, MAC address, OS fingerprint, open ports
//! - SQLite persistence of completed scan batches
//!
//! External utilities (`ping`, `arp`, `nmap`) are optional; when one is
//! missing the affected field degrades instead of failing the scan.

pub mod config;
pub mod constants;
pub mod db;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod model;
pub mod net;
pub mod table;
pub mod tools;

// Re-export commonly used types for convenience
pub use config::{ProbeStrategy, ScanConfig};
pub use db::{ScanStore, SqliteScanStore};
pub use detect::DeviceDetectionStrategy;
pub use engine::{BatchEnricher, NetworkDiscovery};
pub use errors::{NetworkDiscoveryError, ToolError};
pub use model::{Fingerprint, HostRecord, ScanBatch, ScanSummary};
pub use net::subnet::{sanitize_subnet, Subnet};
pub use tools::Toolkit;
