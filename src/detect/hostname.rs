use super::DeviceDetectionStrategy;
use crate::model::Detection;
use crate::tools::ReverseResolver;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

/// Hostname resolution through reverse DNS
pub struct ReverseDnsStrategy {
    resolver: Arc<dyn ReverseResolver>,
}

impl ReverseDnsStrategy {
    pub fn new(resolver: Arc<dyn ReverseResolver>) -> Self {
        Self { resolver }
    }

    /// The PTR name for `ip`, or the address itself when none resolves
    pub async fn resolve(&self, ip: Ipv4Addr) -> String {
        match self.resolver.reverse(ip).await {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                debug!("no reverse DNS name for {}", ip);
                ip.to_string()
            }
        }
    }
}

#[async_trait]
impl DeviceDetectionStrategy for ReverseDnsStrategy {
    fn name(&self) -> &'static str {
        "reverse DNS hostname lookup"
    }

    async fn detect(&self, ip: Ipv4Addr) -> Detection {
        Detection::Hostname(self.resolve(ip).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl ReverseResolver for Fixed {
        async fn reverse(&self, _ip: Ipv4Addr) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[tokio::test]
    async fn uses_resolved_name() {
        let strategy = ReverseDnsStrategy::new(Arc::new(Fixed(Some("printer.lan"))));
        assert_eq!(strategy.resolve(Ipv4Addr::new(10, 0, 0, 3)).await, "printer.lan");
    }

    #[tokio::test]
    async fn falls_back_to_address() {
        let strategy = ReverseDnsStrategy::new(Arc::new(Fixed(None)));
        assert_eq!(strategy.resolve(Ipv4Addr::new(10, 0, 0, 3)).await, "10.0.0.3");
    }

    #[tokio::test]
    async fn blank_name_is_treated_as_missing() {
        let strategy = ReverseDnsStrategy::new(Arc::new(Fixed(Some("  "))));
        assert_eq!(
            strategy.detect(Ipv4Addr::new(10, 0, 0, 3)).await,
            Detection::Hostname("10.0.0.3".to_string())
        );
    }
}
