//! Readers for the OS network databases
//!
//! `/etc/services` maps `port/proto` to a service name and `/etc/protocols`
//! maps IP protocol numbers to names. Both are plain text with `#` comments.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Parsed `/etc/services`
#[derive(Debug, Clone, Default)]
pub struct ServicesDb {
    entries: HashMap<(u16, String), String>,
}

impl ServicesDb {
    /// Load a services file
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Parse services text; the first entry for a `port/proto` pair wins
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();

        for line in text.lines() {
            let line = strip_comment(line);
            let mut fields = line.split_whitespace();
            let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, proto)) = port_proto.split_once('/') else {
                continue;
            };
            let Ok(port) = port.parse::<u16>() else {
                continue;
            };

            entries
                .entry((port, proto.to_ascii_lowercase()))
                .or_insert_with(|| name.to_string());
        }

        Self { entries }
    }

    /// Service name for a port and protocol (protocol matched case-insensitively)
    pub fn lookup(&self, port: u16, proto: &str) -> Option<&str> {
        self.entries
            .get(&(port, proto.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed `/etc/protocols`
#[derive(Debug, Clone, Default)]
pub struct ProtocolsDb {
    by_number: HashMap<u32, String>,
}

impl ProtocolsDb {
    /// Load a protocols file
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Parse protocols text; the first name for a number wins
    pub fn parse(text: &str) -> Self {
        let mut by_number = HashMap::new();

        for line in text.lines() {
            let mut fields = strip_comment(line).split_whitespace();
            let (Some(name), Some(number)) = (fields.next(), fields.next()) else {
                continue;
            };
            if let Ok(number) = number.parse::<u32>() {
                by_number.entry(number).or_insert_with(|| name.to_string());
            }
        }

        Self { by_number }
    }

    /// Protocol name registered for a number
    pub fn name_of(&self, number: u32) -> Option<&str> {
        self.by_number.get(&number).map(String::as_str)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}
