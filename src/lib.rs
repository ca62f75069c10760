//! hitlog - firewall log tail and hit classification library
//!
//! This library exposes the engine that follows a packet-filter log,
//! parses matching records into hits, resolves their services and
//! classifies them before handing them to an event sink.

pub mod classify;
pub mod cli;
pub mod config;
pub mod constants;
pub mod journal;
pub mod models;
pub mod netif;
pub mod output;
pub mod parser;
pub mod services;
pub mod tail;

pub use classify::{Classifier, FilterSettings, Verdict};
pub use config::{ConfigError, Configuration};
pub use journal::{EventSink, HitJournal, MemorySink};
pub use models::{ClassifiedHit, Direction, EventCounters, Hit, TailError};
pub use parser::{HitParser, LinePattern};
pub use services::ServiceResolver;
pub use tail::{LogMonitor, MonitorSettings};
