//! Hit classification
//!
//! Applies the redundancy and relevance filters, tags broadcast and serious
//! hits, and normalizes the direction label. Pure: all state it consults
//! (the previous accepted hit) is passed in by the journal.

use serde::{Deserialize, Serialize};

use crate::constants::PRIVILEGED_PORT_LIMIT;
use crate::models::{ClassifiedHit, Direction, Hit};

/// Filter toggles read from the user's preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Drop a hit identical to the previous accepted one
    pub skip_redundant: bool,
    /// Drop inbound hits not addressed to the firewall itself
    pub skip_not_for_firewall: bool,
}

/// Outcome of classifying one hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept(ClassifiedHit),
    /// Same port, protocol, source and destination as the previous hit
    Redundant,
    /// Neither outbound nor addressed to the firewall
    NotForFirewall,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    filters: FilterSettings,
    firewall_ip: Option<String>,
}

impl Classifier {
    /// `firewall_ip` is the address of the external interface, if known
    pub fn new(filters: FilterSettings, firewall_ip: Option<String>) -> Self {
        Self { filters, firewall_ip }
    }

    pub fn filters(&self) -> FilterSettings {
        self.filters
    }

    pub fn firewall_ip(&self) -> Option<&str> {
        self.firewall_ip.as_deref()
    }

    /// Classify a freshly parsed hit against the previous accepted one
    pub fn classify(&self, mut hit: Hit, previous: Option<&Hit>) -> Verdict {
        if self.filters.skip_redundant && is_redundant(&hit, previous) {
            return Verdict::Redundant;
        }

        let kind = Direction::from_raw(&hit.direction);
        if self.filters.skip_not_for_firewall
            && !self.is_for_firewall(&hit)
            && kind != Direction::Outbound
        {
            return Verdict::NotForFirewall;
        }

        let broadcast = is_broadcast(&hit);
        let serious = self.is_serious(&hit);
        hit.direction = kind.label().to_string();

        Verdict::Accept(ClassifiedHit {
            hit,
            kind,
            serious,
            broadcast,
        })
    }

    /// Destination is the firewall's own external address
    pub fn is_for_firewall(&self, hit: &Hit) -> bool {
        self.firewall_ip
            .as_deref()
            .is_some_and(|ip| ip == hit.destination)
    }

    /// Addressed to the firewall on a privileged port.
    ///
    /// A hit without a port counts as port 0, so portless protocols aimed
    /// at the firewall are serious.
    pub fn is_serious(&self, hit: &Hit) -> bool {
        self.is_for_firewall(hit) && hit.port_number() < PRIVILEGED_PORT_LIMIT
    }
}

/// Loose comparison with the previous accepted hit.
///
/// Direction is not compared: an inbound and an outbound hit with the same
/// port, protocol, source and destination count as duplicates.
pub fn is_redundant(hit: &Hit, previous: Option<&Hit>) -> bool {
    previous.is_some_and(|old| {
        hit.port == old.port
            && hit.protocol == old.protocol
            && hit.source == old.source
            && hit.destination == old.destination
    })
}

/// Destination is a subnet broadcast address
pub fn is_broadcast(hit: &Hit) -> bool {
    hit.destination.ends_with(".255")
}
