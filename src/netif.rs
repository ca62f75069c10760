//! Firewall address discovery
//!
//! The classifier needs the firewall's own external address to tell hits
//! aimed at the firewall from traffic merely passing through it.

use log::{debug, warn};
use nix::ifaddrs::getifaddrs;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::config::FirewallSettings;

/// First IPv4 address bound to interface `name`
pub fn interface_ipv4(name: &str) -> Option<Ipv4Addr> {
    let addrs = match getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            warn!("Could not enumerate network interfaces: {}", e);
            return None;
        }
    };

    addrs
        .filter(|ifa| ifa.interface_name == name)
        .find_map(|ifa| {
            let addr = ifa.address?;
            let sin = addr.as_sockaddr_in()?;
            Some(*SocketAddrV4::from(*sin).ip())
        })
}

/// The firewall's external address as the classifier compares it.
///
/// A fixed `external_ip` wins; otherwise the external interface is looked
/// up. `None` means no hit is ever considered addressed to the firewall.
pub fn resolve_firewall_ip(settings: &FirewallSettings) -> Option<String> {
    if let Some(ip) = &settings.external_ip {
        return Some(ip.clone());
    }

    let iface = settings.external_interface.as_deref()?;
    match interface_ipv4(iface) {
        Some(ip) => {
            debug!("External interface {} has address {}", iface, ip);
            Some(ip.to_string())
        }
        None => {
            warn!("External interface {} has no IPv4 address", iface);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_address_wins() {
        let settings = FirewallSettings {
            external_interface: Some("does-not-exist0".to_string()),
            external_ip: Some("198.51.100.9".to_string()),
        };
        assert_eq!(resolve_firewall_ip(&settings).as_deref(), Some("198.51.100.9"));
    }

    #[test]
    fn test_nothing_configured() {
        assert_eq!(resolve_firewall_ip(&FirewallSettings::default()), None);
    }

    #[test]
    fn test_unknown_interface() {
        assert_eq!(interface_ipv4("does-not-exist0"), None);
    }

    #[test]
    fn test_loopback_when_present() {
        // Containers may lack an IPv4 loopback; only check when one exists
        if let Some(ip) = interface_ipv4("lo") {
            assert!(ip.is_loopback());
        }
    }
}
