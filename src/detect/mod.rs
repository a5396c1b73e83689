use crate::model::Detection;
use async_trait::async_trait;
use std::net::Ipv4Addr;

pub mod hostname;
pub mod mac;
pub mod os;
pub mod port;

/// Device detection strategy trait
///
/// Each strategy resolves one field of a host record (hostname, MAC, OS,
/// open ports) from its own source. Strategies never fail: a missing or
/// broken source degrades to the field's documented fallback.
#[async_trait]
pub trait DeviceDetectionStrategy: Send + Sync {
    async fn detect(&self, ip: Ipv4Addr) -> Detection;

    /// Return a human-readable name for this detection strategy
    fn name(&self) -> &'static str;
}
