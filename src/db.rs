//! Persistence of completed scan batches.
//!
//! The discovery engine never touches storage itself; callers hand a
//! finished list of [`HostRecord`]s to a [`ScanStore`].

use crate::errors::NetworkDiscoveryError;
use crate::model::{HostRecord, ScanBatch, ScanSummary};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Mutex;

pub trait ScanStore {
    /// Persist one batch and return its id
    fn save(&self, hosts: &[HostRecord]) -> Result<i64, NetworkDiscoveryError>;

    /// Records of batch `id`; empty when the id is unknown
    fn get(&self, id: i64) -> Result<Vec<HostRecord>, NetworkDiscoveryError>;

    /// Records of the most recent batch; empty when nothing has been saved
    fn get_latest(&self) -> Result<Vec<HostRecord>, NetworkDiscoveryError>;

    /// Every batch, oldest first
    fn get_history(&self) -> Result<Vec<ScanSummary>, NetworkDiscoveryError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS hosts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id INTEGER NOT NULL REFERENCES scans(id),
    ip TEXT NOT NULL,
    hostname TEXT NOT NULL,
    mac TEXT,
    os TEXT,
    open_ports TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_hosts_scan_id ON hosts(scan_id);
";

/// SQLite-backed store
pub struct SqliteScanStore {
    conn: Mutex<Connection>,
}

impl SqliteScanStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NetworkDiscoveryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, NetworkDiscoveryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, NetworkDiscoveryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, NetworkDiscoveryError> {
        self.conn
            .lock()
            .map_err(|_| NetworkDiscoveryError::Other("database connection lock poisoned".into()))
    }

    /// The full batch, timestamp included
    pub fn get_batch(&self, id: i64) -> Result<Option<ScanBatch>, NetworkDiscoveryError> {
        let created_at: Option<DateTime<Utc>> = {
            let conn = self.lock()?;
            conn.query_row("SELECT timestamp FROM scans WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?
        };

        match created_at {
            Some(created_at) => Ok(Some(ScanBatch {
                id,
                created_at,
                hosts: self.get(id)?,
            })),
            None => Ok(None),
        }
    }
}

impl ScanStore for SqliteScanStore {
    fn save(&self, hosts: &[HostRecord]) -> Result<i64, NetworkDiscoveryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO scans (timestamp) VALUES (?1)", [Utc::now()])?;
        let scan_id = tx.last_insert_rowid();

        {
            let mut insert = tx.prepare(
                "INSERT INTO hosts (scan_id, ip, hostname, mac, os, open_ports)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for host in hosts {
                insert.execute(params![
                    scan_id,
                    host.ip.to_string(),
                    host.hostname,
                    host.mac,
                    host.os,
                    join_ports(&host.open_ports),
                ])?;
            }
        }

        tx.commit()?;
        Ok(scan_id)
    }

    fn get(&self, id: i64) -> Result<Vec<HostRecord>, NetworkDiscoveryError> {
        let conn = self.lock()?;
        let mut query = conn.prepare(
            "SELECT ip, hostname, mac, os, open_ports FROM hosts WHERE scan_id = ?1 ORDER BY id",
        )?;
        let rows = query.query_map([id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut hosts = Vec::new();
        for row in rows {
            let (ip, hostname, mac, os, ports) = row?;
            let ip: Ipv4Addr = ip
                .parse()
                .map_err(|e| NetworkDiscoveryError::Other(format!("stored ip '{}': {}", ip, e)))?;
            hosts.push(HostRecord {
                ip,
                hostname,
                mac,
                os,
                open_ports: split_ports(&ports),
            });
        }
        Ok(hosts)
    }

    fn get_latest(&self) -> Result<Vec<HostRecord>, NetworkDiscoveryError> {
        let latest: Option<i64> = {
            let conn = self.lock()?;
            conn.query_row("SELECT MAX(id) FROM scans", [], |row| row.get(0))?
        };
        match latest {
            Some(id) => self.get(id),
            None => Ok(Vec::new()),
        }
    }

    fn get_history(&self) -> Result<Vec<ScanSummary>, NetworkDiscoveryError> {
        let conn = self.lock()?;
        let mut query = conn.prepare("SELECT id, timestamp FROM scans ORDER BY id")?;
        let summaries = query
            .query_map([], |row| {
                Ok(ScanSummary {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }
}

fn join_ports(ports: &BTreeSet<u16>) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_ports(stored: &str) -> BTreeSet<u16> {
    stored
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect()
}
