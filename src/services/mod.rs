//! Service and protocol name resolution
//!
//! Maps a destination port to the service (or known exploit) that usually
//! lives there. The static tables are expanded into a port table on first
//! use; misses fall back to the OS service database and the answer is cached
//! in the same table for the rest of the process lifetime.

pub mod icmp;
pub mod netdb;
pub mod tables;

use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::constants::{DEFAULT_PROTOCOLS_PATH, DEFAULT_SERVICES_PATH};
use netdb::{ProtocolsDb, ServicesDb};
use tables::{expand_ports, ServiceDef, MALICIOUS_SERVICES, WELL_KNOWN_SERVICES};

pub use icmp::icmp_type_name;

/// Name returned when no resolution is possible
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Shared, append-only port → name resolver
///
/// Safe to share between sessions: the only mutation is inserting OS
/// database answers into the cache, and entries are never replaced or evicted.
#[derive(Debug)]
pub struct ServiceResolver {
    services_path: PathBuf,
    protocols_path: PathBuf,
    table: Mutex<Option<HashMap<u32, String>>>,
    services_db: OnceLock<ServicesDb>,
    protocols_db: OnceLock<ProtocolsDb>,
}

impl ServiceResolver {
    /// Create a resolver backed by the given OS database files
    pub fn new(services_path: impl Into<PathBuf>, protocols_path: impl Into<PathBuf>) -> Self {
        Self {
            services_path: services_path.into(),
            protocols_path: protocols_path.into(),
            table: Mutex::new(None),
            services_db: OnceLock::new(),
            protocols_db: OnceLock::new(),
        }
    }

    /// Resolver backed by `/etc/services` and `/etc/protocols`
    pub fn system() -> Self {
        Self::new(DEFAULT_SERVICES_PATH, DEFAULT_PROTOCOLS_PATH)
    }

    /// Resolve the service implicated by a destination port
    pub fn resolve_service(&self, port: u32, protocol: Option<&str>) -> String {
        let protocol = match protocol {
            Some(p) if !p.is_empty() => p,
            _ => return UNKNOWN_SERVICE.to_string(),
        };
        if port == 0 {
            return UNKNOWN_SERVICE.to_string();
        }

        // First use reads the OS database; do that before taking the table lock
        let services = self.services_db();

        let mut guard = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let table = guard.get_or_insert_with(build_port_table);

        if let Some(name) = table.get(&port) {
            return name.clone();
        }

        let Ok(os_port) = u16::try_from(port) else {
            return UNKNOWN_SERVICE.to_string();
        };
        match services.lookup(os_port, protocol) {
            Some(name) if !name.is_empty() => {
                let name = capitalize(name);
                debug!("Caching OS service name {} for port {}", name, port);
                table.insert(port, name.clone());
                name
            }
            _ => UNKNOWN_SERVICE.to_string(),
        }
    }

    /// Resolve an ICMP type code to its message name
    pub fn resolve_icmp_name(&self, type_code: u32) -> &'static str {
        icmp_type_name(type_code)
    }

    /// Name of an IP protocol number from the OS protocol database
    pub fn protocol_name(&self, number: u32) -> Option<&str> {
        self.protocols_db().name_of(number)
    }

    /// Number of ports currently known to the port table
    pub fn known_ports(&self) -> usize {
        let guard = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map_or(0, HashMap::len)
    }

    fn services_db(&self) -> &ServicesDb {
        self.services_db
            .get_or_init(|| load_db(&self.services_path, ServicesDb::load))
    }

    fn protocols_db(&self) -> &ProtocolsDb {
        self.protocols_db
            .get_or_init(|| load_db(&self.protocols_path, ProtocolsDb::load))
    }
}

impl Default for ServiceResolver {
    fn default() -> Self {
        Self::system()
    }
}

fn load_db<T: Default>(path: &Path, load: fn(&Path) -> std::io::Result<T>) -> T {
    match load(path) {
        Ok(db) => db,
        Err(e) => {
            warn!("Could not read {}: {}; OS name lookups disabled", path.display(), e);
            T::default()
        }
    }
}

/// Expand the static definitions, well-known first; later entries win
fn build_port_table() -> HashMap<u32, String> {
    let mut table = HashMap::new();
    append_services(&mut table, WELL_KNOWN_SERVICES);
    append_services(&mut table, MALICIOUS_SERVICES);
    debug!("Service table built with {} ports", table.len());
    table
}

fn append_services(table: &mut HashMap<u32, String>, services: &[ServiceDef]) {
    for service in services {
        for port in expand_ports(service.ports) {
            table.insert(port, service.name.to_string());
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
