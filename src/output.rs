//! Output formatting module
//!
//! Handles:
//! - Human-readable hit lines with serious/broadcast tags
//! - JSON lines output with an observation timestamp
//! - Counter summary
//! - Saving accepted events to a text file
//! - Progress indicator for reloads

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::error;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::journal::EventSink;
use crate::models::{ClassifiedHit, EventCounters, Hit};

pub mod progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// One accepted hit as emitted in JSON mode
#[derive(Debug, Serialize)]
pub struct HitEvent<'a> {
    pub observed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub hit: &'a ClassifiedHit,
}

/// Format an accepted hit as a console line.
/// Broadcast wins over serious, matching the counters.
pub fn format_hit_human(hit: &ClassifiedHit) -> String {
    let tag = if hit.broadcast {
        "[broadcast] "
    } else if hit.serious {
        "[SERIOUS] "
    } else {
        ""
    };
    format!("{}{}", tag, hit.hit)
}

/// Format an accepted hit as a JSON line
pub fn format_hit_json(hit: &ClassifiedHit, observed_at: DateTime<Utc>) -> serde_json::Result<String> {
    serde_json::to_string(&HitEvent { observed_at, hit })
}

/// One line of a saved event file
pub fn format_save_line(hit: &Hit) -> String {
    format!(
        "Time:{} Direction: {} In:{} Out:{} Port:{} Source:{} Destination:{} Length:{} \
         TOS:{} Protocol:{} Service:{}",
        hit.time,
        hit.direction,
        hit.in_iface,
        hit.out_iface,
        hit.port,
        hit.source,
        hit.destination,
        hit.length,
        hit.tos,
        hit.protocol,
        hit.service
    )
}

/// Write events in save-file format, one per line
pub fn write_events<'a, W: Write>(out: &mut W, hits: impl IntoIterator<Item = &'a Hit>) -> io::Result<()> {
    for hit in hits {
        writeln!(out, "{}", format_save_line(hit))?;
    }
    out.flush()
}

/// Save events to `path`, replacing any existing file
pub fn save_events<'a>(path: &Path, hits: impl IntoIterator<Item = &'a Hit>) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Error writing to file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_events(&mut out, hits)
        .with_context(|| format!("Error writing to file {}", path.display()))
}

/// Counter summary printed after a reload
pub fn format_summary(counters: &EventCounters) -> String {
    format!(
        "Summary: {} events (inbound: {}, outbound: {}, serious inbound: {}, serious outbound: {})",
        counters.total(),
        counters.inbound,
        counters.outbound,
        counters.serious_inbound,
        counters.serious_outbound
    )
}

/// Sink printing accepted hits to a writer, optionally keeping them for
/// a later save
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    format: OutputFormat,
    record: bool,
    recorded: Vec<Hit>,
    printed: usize,
    broken: bool,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(format: OutputFormat, record: bool) -> Self {
        Self::new(io::stdout(), format, record)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, format: OutputFormat, record: bool) -> Self {
        Self {
            out,
            format,
            record,
            recorded: Vec::new(),
            printed: 0,
            broken: false,
        }
    }

    /// Hits kept for saving, in arrival order
    pub fn recorded(&self) -> &[Hit] {
        &self.recorded
    }

    /// Hits printed since the last clear
    pub fn printed(&self) -> usize {
        self.printed
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&self, hit: &ClassifiedHit) -> Option<String> {
        match self.format {
            OutputFormat::Human => Some(format_hit_human(hit)),
            OutputFormat::Json => match format_hit_json(hit, Utc::now()) {
                Ok(line) => Some(line),
                Err(e) => {
                    error!("Failed to serialize hit: {}", e);
                    None
                }
            },
        }
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn on_event(&mut self, hit: &ClassifiedHit) -> bool {
        if self.record {
            self.recorded.push(hit.hit.clone());
        }
        if self.broken {
            return false;
        }
        let Some(line) = self.render(hit) else {
            return false;
        };

        match writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            Ok(()) => {
                self.printed += 1;
                true
            }
            Err(e) => {
                // Typically a closed pipe; report once and stop printing
                error!("Failed to write event: {}", e);
                self.broken = true;
                false
            }
        }
    }

    fn on_clear(&mut self) {
        self.recorded.clear();
        self.printed = 0;
    }
}
