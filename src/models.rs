//! Data models module
//!
//! Defines core data structures:
//! - Hit: one packet-filter log record split into its fields
//! - Direction: normalized traffic direction of a hit
//! - ClassifiedHit: an accepted hit with its severity/broadcast tags
//! - EventCounters: per-direction tallies kept by the journal
//! - TailError: failures of the log tail sessions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single firewall log record (one blocked or logged packet)
///
/// Every field is a plain string; a marker missing from the source line
/// leaves its field empty rather than absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// First 15 characters of the raw line (syslog timestamp)
    pub time: String,
    /// Direction label; raw log prefix until classified, display label after
    pub direction: String,
    /// Inbound interface (`IN=`)
    #[serde(rename = "in")]
    pub in_iface: String,
    /// Outbound interface (`OUT=`)
    #[serde(rename = "out")]
    pub out_iface: String,
    /// Destination port (`DPT=`)
    pub port: String,
    /// Source address (`SRC=`)
    pub source: String,
    /// Destination address (`DST=`)
    pub destination: String,
    /// Packet length (`LEN=`)
    pub length: String,
    /// Type-of-service byte (`TOS=`)
    pub tos: String,
    /// Protocol name; numeric codes are resolved to names at parse time
    pub protocol: String,
    /// Resolved service or ICMP type name
    pub service: String,
}

impl Hit {
    /// Destination port as a number, `0` when absent or not numeric
    pub fn port_number(&self) -> u32 {
        self.port.trim().parse().unwrap_or(0)
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HIT: {} from {} to {}:{}, protocol {}, service {}",
            self.time, self.source, self.destination, self.port, self.protocol, self.service
        )
    }
}

/// Traffic direction of a hit, derived from the log prefix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
    #[default]
    Unknown,
}

impl Direction {
    /// Normalize the raw prefix written by the firewall's LOG rules
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "Inbound" => Direction::Inbound,
            "Outbound" => Direction::Outbound,
            _ => Direction::Unknown,
        }
    }

    /// Display form handed to the sink
    pub fn label(self) -> &'static str {
        match self {
            Direction::Inbound => "Inbound",
            Direction::Outbound => "Outbound",
            Direction::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An accepted hit together with the classifier's verdict on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedHit {
    /// The hit, with its direction label already normalized
    #[serde(flatten)]
    pub hit: Hit,
    /// Normalized direction
    #[serde(skip)]
    pub kind: Direction,
    /// Addressed to the firewall on a privileged port
    pub serious: bool,
    /// Destination is a broadcast address
    pub broadcast: bool,
}

/// Tallies of accepted hits, reset whenever the journal is cleared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    /// Accepted inbound hits
    pub inbound: u64,
    /// Accepted outbound hits
    pub outbound: u64,
    /// Serious hits not labelled outbound
    pub serious_inbound: u64,
    /// Serious outbound hits
    pub serious_outbound: u64,
}

impl EventCounters {
    /// Total number of hits with a known direction
    pub fn total(&self) -> u64 {
        self.inbound + self.outbound
    }
}

/// Errors raised by log tail and reload sessions
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// The log could not be opened; the session is never created
    #[error("Log file not found or access denied: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A read or seek failed mid-session; the session was aborted
    #[error("Log stream error: {0}")]
    Stream(#[from] std::io::Error),
}
