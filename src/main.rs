// ==========================================================
//  hostscout  - subnet sweep and host enrichment
// ==========================================================

use clap::Parser;
use hostscout::net::interface;
use hostscout::{
    sanitize_subnet, table, NetworkDiscovery, NetworkDiscoveryError, ProbeStrategy, ScanConfig,
    ScanStore, SqliteScanStore,
};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostscout", version, about = "Discover and fingerprint hosts on a local IPv4 subnet")]
struct Cli {
    /// CIDR network (192.168.1.0/24), single address, or interface name (eth0)
    target: Option<String>,

    /// List network interfaces and their networks
    #[arg(long)]
    list: bool,

    /// Concurrent liveness probes
    #[arg(short, long, default_value_t = hostscout::constants::DEFAULT_PROBE_CONCURRENCY)]
    jobs: usize,

    /// Hosts enriched concurrently
    #[arg(long, default_value_t = hostscout::constants::DEFAULT_ENRICH_CONCURRENCY)]
    enrich_jobs: usize,

    /// Judge liveness by TCP connect to this port instead of ping
    #[arg(long, value_name = "PORT")]
    tcp_probe: Option<u16>,

    /// Only sweep; skip hostname, MAC, OS and port enrichment
    #[arg(long)]
    skip_enrich: bool,

    /// SQLite database to save the batch into
    #[arg(long, env = "DB_PATH")]
    db: Option<PathBuf>,

    /// Print saved scan history from --db and exit
    #[arg(long, requires = "db")]
    history: bool,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn print_interfaces() -> Result<(), NetworkDiscoveryError> {
    println!("Available network interfaces:");
    for candidate in interface::list_interface_networks()? {
        println!(
            "  {:<12} IPv4: {:<15} -> Network: {}",
            candidate.name, candidate.ip, candidate.network
        );
    }
    Ok(())
}

fn resolve_target(target: &str) -> Result<String, NetworkDiscoveryError> {
    if target.contains('/') || target.parse::<Ipv4Addr>().is_ok() {
        sanitize_subnet(target)
    } else {
        interface::get_network_from_interface(target)
    }
}

#[tokio::main]
async fn main() -> Result<(), NetworkDiscoveryError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if cli.list {
        return print_interfaces();
    }

    let store = cli.db.as_ref().map(SqliteScanStore::open).transpose()?;

    if cli.history {
        if let Some(store) = &store {
            let history = store.get_history()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                println!("{}", table::render_history(&history));
            }
        }
        return Ok(());
    }

    let Some(target) = cli.target.as_deref() else {
        eprintln!("No target given. Usage: hostscout [INTERFACE_NAME|CIDR_NETWORK]");
        print_interfaces()?;
        return Err(NetworkDiscoveryError::Other("No network specified".to_string()));
    };
    let network = resolve_target(target)?;

    let mut config = ScanConfig::default();
    if let Some(port) = cli.tcp_probe {
        config.probe = ProbeStrategy::Tcp { port };
    }
    let mut discovery = NetworkDiscovery::new(config);
    discovery.set_concurrency(cli.jobs);
    discovery.set_enrich_concurrency(cli.enrich_jobs);

    info!("Target network: {}", network);

    let hosts = if cli.skip_enrich {
        discovery
            .scan_subnet(&network)
            .await?
            .into_iter()
            .map(hostscout::HostRecord::bare)
            .collect()
    } else {
        discovery.discover(&network).await?
    };

    if let Some(store) = &store {
        let id = store.save(&hosts)?;
        info!("Saved {} hosts as scan #{}", hosts.len(), id);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&hosts)?);
    } else {
        println!("{}", table::render_hosts(&hosts));
        println!("{} hosts up on {}", hosts.len(), network);
    }

    Ok(())
}
