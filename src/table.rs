use crate::model::{HostRecord, ScanSummary};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

const MAX_LISTED_PORTS: usize = 8;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

/// Format the ports column, truncating long lists
fn format_ports(host: &HostRecord) -> String {
    if host.open_ports.is_empty() {
        return "—".to_string();
    }
    let mut ports = host
        .open_ports
        .iter()
        .take(MAX_LISTED_PORTS)
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if host.open_ports.len() > MAX_LISTED_PORTS {
        ports.push_str(&format!(" (+{})", host.open_ports.len() - MAX_LISTED_PORTS));
    }
    ports
}

pub fn render_hosts(hosts: &[HostRecord]) -> Table {
    let mut table = base_table();
    table.set_header(vec!["IP", "Hostname", "MAC", "OS", "Open Ports"]);

    for host in hosts {
        table.add_row(vec![
            Cell::new(host.ip),
            Cell::new(&host.hostname),
            Cell::new(host.mac.as_deref().unwrap_or("—")),
            Cell::new(host.os.as_deref().unwrap_or("—")),
            Cell::new(format_ports(host)),
        ]);
    }
    table
}

pub fn render_history(history: &[ScanSummary]) -> Table {
    let mut table = base_table();
    table.set_header(vec!["Scan", "Timestamp (UTC)"]);
    for entry in history {
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    table
}
