use hostscout::detect::port::PortScanStrategy;
use hostscout::tools::TcpConnector;
use hostscout::ScanConfig;
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{ip, test_config, FakeConnector, FakePortScan, NMAP_PORT_REPORT};
use tokio::net::TcpListener;

mod test_utils;

fn scanner(output: Option<&str>) -> Arc<FakePortScan> {
    Arc::new(FakePortScan::reporting(output))
}

#[tokio::test]
async fn test_nmap_report_is_parsed() {
    let connector = Arc::new(FakeConnector::with_open(&[8080]));
    let strategy = PortScanStrategy::new(
        &test_config(),
        scanner(Some(NMAP_PORT_REPORT)),
        connector.clone(),
    );

    let ports = strategy.resolve(ip("192.168.1.20")).await;
    assert_eq!(ports, BTreeSet::from([22, 80, 443]));
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nmap_with_nothing_open_does_not_fall_back() {
    let connector = Arc::new(FakeConnector::with_open(&[22]));
    let strategy = PortScanStrategy::new(
        &test_config(),
        scanner(Some("Nmap done: 1 IP address (1 host up)\n")),
        connector.clone(),
    );

    assert!(strategy.resolve(ip("192.168.1.20")).await.is_empty());
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_nmap_probes_every_candidate() {
    let config = test_config();
    let connector = Arc::new(FakeConnector::with_open(&[22, 443, 12345]));
    let strategy = PortScanStrategy::new(&config, scanner(None), connector.clone());

    let ports = strategy.resolve(ip("192.168.1.20")).await;
    // 12345 is not a candidate, so it is never tried
    assert_eq!(ports, BTreeSet::from([22, 443]));
    assert_eq!(
        connector.attempts.load(Ordering::SeqCst),
        config.top_ports.len()
    );
}

#[tokio::test]
async fn test_socket_fallback_finds_local_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = ScanConfig {
        top_ports: vec![port],
        ..test_config()
    };
    let strategy = PortScanStrategy::new(
        &config,
        scanner(None),
        Arc::new(TcpConnector::new(Duration::from_secs(1))),
    );

    let ports = strategy.resolve(ip("127.0.0.1")).await;
    assert!(ports.contains(&port));
}

#[tokio::test]
async fn test_nmap_scans_exactly_the_configured_ports() {
    let config = ScanConfig {
        top_ports: vec![22, 8443],
        ..test_config()
    };
    let nmap = scanner(Some("22/tcp   open  ssh\n8080/tcp open  http-proxy\n"));
    let strategy = PortScanStrategy::new(
        &config,
        nmap.clone(),
        Arc::new(FakeConnector::default()),
    );

    let ports = strategy.resolve(ip("192.168.1.20")).await;
    assert_eq!(nmap.requested(), vec![vec![22, 8443]]);
    // 8080 was never asked for
    assert_eq!(ports, BTreeSet::from([22]));
}
