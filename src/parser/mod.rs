//! Field parser for packet-filter log records
//!
//! Turns a line that passed the glob pre-filter into a [`Hit`]. Fields are
//! located by literal markers (`SRC=`, `DPT=`, ...) and end at the next
//! space; a marker missing from the line leaves its field empty.

pub mod markers;
pub mod pattern;

use std::sync::Arc;

use crate::models::Hit;
use crate::services::ServiceResolver;
use markers::{leading_chars, text_between};

pub use pattern::LinePattern;

/// Length of the syslog timestamp prefix
pub const TIMESTAMP_LEN: usize = 15;

/// Field markers in the order the kernel writes them
pub const MARKERS: &[&str] = &[
    "IN=", "OUT=", "SRC=", "DST=", "LEN=", "TOS=", "PROTO=", "TYPE=", "DPT=",
];

/// Parses matched lines and resolves their protocol and service names
#[derive(Debug, Clone)]
pub struct HitParser {
    resolver: Arc<ServiceResolver>,
}

impl HitParser {
    pub fn new(resolver: Arc<ServiceResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<ServiceResolver> {
        &self.resolver
    }

    /// Extract every field of a log record. Never fails.
    pub fn parse_line(&self, line: &str) -> Hit {
        let field = |marker: &str| text_between(line, marker, " ").to_string();

        let mut hit = Hit {
            time: leading_chars(line, TIMESTAMP_LEN).to_string(),
            direction: text_between(line, "kernel:", "IN").trim().to_string(),
            in_iface: field("IN="),
            out_iface: field("OUT="),
            source: field("SRC="),
            destination: field("DST="),
            length: field("LEN="),
            tos: field("TOS="),
            protocol: field("PROTO="),
            port: field("DPT="),
            service: String::new(),
        };
        let icmp_type = text_between(line, "TYPE=", " ");

        if is_numeric(&hit.protocol) {
            if let Some(name) = hit
                .protocol
                .parse::<u32>()
                .ok()
                .and_then(|number| self.resolver.protocol_name(number))
            {
                hit.protocol = name.to_uppercase();
            }
        }

        if hit.protocol.eq_ignore_ascii_case("icmp") && !icmp_type.is_empty() {
            let code = icmp_type.parse::<u32>().unwrap_or(u32::MAX);
            hit.service = self.resolver.resolve_icmp_name(code).to_string();
        } else if !hit.port.is_empty() && !hit.protocol.is_empty() {
            hit.service = self
                .resolver
                .resolve_service(hit.port_number(), Some(&hit.protocol));
        }

        hit
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
