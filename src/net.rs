use crate::config::ScanConfig;
use crate::errors::NetworkDiscoveryError;
use crate::executor::run_bounded;
use crate::tools::PingRunner;
use ipnetwork::Ipv4Network;
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::{debug, info};

/// CIDR subnet parsing and host enumeration
pub mod subnet {
    use super::*;

    /// An IPv4 network normalised to its network address
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Subnet {
        network: Ipv4Network,
    }

    impl Subnet {
        /// Parse CIDR notation non-strictly: host bits in the address are
        /// discarded, so `10.0.0.9/30` describes `10.0.0.8/30`.
        pub fn parse(spec: &str) -> Result<Self, NetworkDiscoveryError> {
            let trimmed = spec.trim();
            let Some((address, _)) = trimmed.split_once('/') else {
                return Err(NetworkDiscoveryError::invalid_subnet(
                    spec,
                    "expected CIDR notation such as 192.168.1.0/24",
                ));
            };
            // ipnetwork accepts abbreviated forms like 10.1/16
            if address.split('.').count() != 4 {
                return Err(NetworkDiscoveryError::invalid_subnet(
                    spec,
                    "address must have four octets",
                ));
            }

            let parsed = Ipv4Network::from_str(trimmed)
                .map_err(|e| NetworkDiscoveryError::invalid_subnet(spec, e.to_string()))?;
            let network = Ipv4Network::new(parsed.network(), parsed.prefix())
                .map_err(|e| NetworkDiscoveryError::invalid_subnet(spec, e.to_string()))?;

            Ok(Self { network })
        }

        pub fn network(&self) -> Ipv4Addr {
            self.network.network()
        }

        pub fn broadcast(&self) -> Ipv4Addr {
            self.network.broadcast()
        }

        pub fn prefix(&self) -> u8 {
            self.network.prefix()
        }

        /// Usable host addresses in ascending order.
        ///
        /// Network and broadcast are excluded, except on /31 (both ends are
        /// point-to-point hosts) and /32 (the single address).
        pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
            let first = u32::from(self.network());
            let last = u32::from(self.broadcast());
            let (start, end) = match self.prefix() {
                31 | 32 => (first, last),
                _ => (first + 1, last - 1),
            };
            (start..=end).map(Ipv4Addr::from)
        }

        pub fn host_count(&self) -> u64 {
            let size = u64::from(u32::from(self.broadcast()) - u32::from(self.network())) + 1;
            match self.prefix() {
                31 | 32 => size,
                _ => size - 2,
            }
        }
    }

    impl fmt::Display for Subnet {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}/{}", self.network(), self.prefix())
        }
    }

    /// Validate user input and return the canonical network form.
    ///
    /// Only digits, dots and a slash are accepted, which rejects anything
    /// that could smuggle shell or SQL text through to later stages. A bare
    /// address is read as a single-host /32.
    pub fn sanitize_subnet(input: &str) -> Result<String, NetworkDiscoveryError> {
        let trimmed = input.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == '/')
        {
            return Err(NetworkDiscoveryError::invalid_subnet(
                input,
                "only digits, '.' and '/' are allowed",
            ));
        }
        let subnet = if trimmed.contains('/') {
            Subnet::parse(trimmed)?
        } else {
            Subnet::parse(&format!("{}/32", trimmed))?
        };
        Ok(subnet.to_string())
    }
}

/// Liveness probing and the subnet sweep
pub mod ping {
    use super::subnet::Subnet;
    use super::*;

    /// Returns the address if the liveness check succeeds, `None` otherwise.
    pub async fn is_alive(pinger: &dyn PingRunner, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        match pinger.ping(ip).await {
            Ok(()) => Some(ip),
            Err(e) => {
                debug!("{} did not answer: {}", ip, e);
                None
            }
        }
    }

    /// Probe every usable host of `subnet_spec` once and return the ones
    /// that answered, in address order.
    pub async fn scan_subnet(
        subnet_spec: &str,
        pinger: &dyn PingRunner,
        config: &ScanConfig,
    ) -> Result<Vec<Ipv4Addr>, NetworkDiscoveryError> {
        let subnet = Subnet::parse(subnet_spec)?;
        info!(
            "Sweeping {} ({} candidate hosts, {} probes in flight)",
            subnet,
            subnet.host_count(),
            config.probe_concurrency
        );

        let results = run_bounded(subnet.hosts(), config.probe_concurrency, |ip| {
            is_alive(pinger, ip)
        })
        .await;

        let alive: Vec<Ipv4Addr> = results.into_iter().flatten().collect();
        info!("Found {} alive hosts in {}", alive.len(), subnet);
        Ok(alive)
    }
}

/// Network interface detection and management utilities
pub mod interface {
    use super::*;

    /// An interface with a usable IPv4 address and the network it sits on
    #[derive(Debug, Clone)]
    pub struct InterfaceNetwork {
        pub name: String,
        pub ip: Ipv4Addr,
        pub network: String,
    }

    /// Calculate the CIDR network an address sits on from its netmask
    pub fn calculate_network_cidr(
        ip: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<String, NetworkDiscoveryError> {
        let prefix = ipnetwork::ipv4_mask_to_prefix(netmask)
            .map_err(|e| NetworkDiscoveryError::Other(format!("bad netmask {}: {}", netmask, e)))?;
        let network = Ipv4Network::new(ip, prefix)
            .map_err(|e| NetworkDiscoveryError::Other(e.to_string()))?;
        Ok(format!("{}/{}", network.network(), prefix))
    }

    /// Every non-loopback interface with an IPv4 address and netmask
    pub fn list_interface_networks() -> Result<Vec<InterfaceNetwork>, NetworkDiscoveryError> {
        let mut found = Vec::new();
        for interface in NetworkInterface::show()? {
            for addr in &interface.addr {
                if let Addr::V4(v4) = addr {
                    if v4.ip.is_loopback() || v4.ip.is_unspecified() {
                        continue;
                    }
                    if let Some(netmask) = v4.netmask {
                        found.push(InterfaceNetwork {
                            name: interface.name.clone(),
                            ip: v4.ip,
                            network: calculate_network_cidr(v4.ip, netmask)?,
                        });
                    }
                }
            }
        }
        Ok(found)
    }

    /// Get the network CIDR for a specific interface name
    pub fn get_network_from_interface(
        interface_name: &str,
    ) -> Result<String, NetworkDiscoveryError> {
        list_interface_networks()?
            .into_iter()
            .find(|candidate| candidate.name == interface_name)
            .map(|candidate| {
                info!(
                    "Interface {} has IP {}, network {}",
                    interface_name, candidate.ip, candidate.network
                );
                candidate.network
            })
            .ok_or_else(|| NetworkDiscoveryError::InterfaceNotFound(interface_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::interface::calculate_network_cidr;
    use super::subnet::{sanitize_subnet, Subnet};
    use super::*;

    #[test]
    fn parses_slash_24() {
        let subnet = Subnet::parse("192.168.1.0/24").unwrap();
        assert_eq!(subnet.host_count(), 254);
        let hosts: Vec<Ipv4Addr> = subnet.hosts().collect();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(192, 168, 1, 254));
    }

    #[test]
    fn slash_30_has_two_hosts() {
        let hosts: Vec<Ipv4Addr> = Subnet::parse("10.0.0.0/30").unwrap().hosts().collect();
        assert_eq!(hosts, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
    }

    #[test]
    fn host_bits_are_ignored() {
        let subnet = Subnet::parse("10.0.0.9/30").unwrap();
        assert_eq!(subnet.network(), Ipv4Addr::new(10, 0, 0, 8));
        assert_eq!(subnet.to_string(), "10.0.0.8/30");
    }

    #[test]
    fn point_to_point_and_single_host() {
        assert_eq!(Subnet::parse("10.0.0.0/31").unwrap().hosts().count(), 2);
        let single: Vec<Ipv4Addr> = Subnet::parse("10.0.0.5/32").unwrap().hosts().collect();
        assert_eq!(single, vec![Ipv4Addr::new(10, 0, 0, 5)]);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["1.1.1.0/24; DROP TABLE", "10.0.0.0/33", "300.1.1.1/24", "10.0.0.1", ""] {
            assert!(
                matches!(Subnet::parse(bad), Err(NetworkDiscoveryError::InvalidSubnet { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn sanitize_canonicalises() {
        assert_eq!(sanitize_subnet("192.168.1.0/24").unwrap(), "192.168.1.0/24");
        assert_eq!(sanitize_subnet(" 192.168.1.77/24 ").unwrap(), "192.168.1.0/24");
        assert!(sanitize_subnet("1.1.1.0/24; DROP TABLE").is_err());
    }

    #[test]
    fn sanitize_reads_bare_address_as_single_host() {
        assert_eq!(sanitize_subnet("10.0.0.1").unwrap(), "10.0.0.1/32");
        assert!(sanitize_subnet("10.0.1").is_err());
        assert!(sanitize_subnet("/").is_err());
    }

    #[test]
    fn network_from_netmask() {
        let cidr = calculate_network_cidr(
            Ipv4Addr::new(172, 16, 5, 20),
            Ipv4Addr::new(255, 255, 240, 0),
        )
        .unwrap();
        assert_eq!(cidr, "172.16.0.0/20");
    }
}
