//! Global constants for hitlog
//!
//! Centralized location for application-wide constants

/// Crate name used for the default log filter directive
pub const APP_SUBSYSTEM: &str = "hitlog";

/// Bytes requested per read of the monitored log
pub const FILE_BUF: usize = 4096;

/// Continuous tail poll period in milliseconds
pub const POLL_INTERVAL_MS: u64 = 500;

/// Poll period bounds accepted from configuration (milliseconds)
pub const POLL_INTERVAL_MIN_MS: u64 = 50;
pub const POLL_INTERVAL_MAX_MS: u64 = 60_000;

/// Chunk size bounds accepted from configuration (bytes). A chunk must hold
/// a whole record, and kernel LOG records run to a few hundred bytes.
pub const CHUNK_SIZE_MIN: usize = 1024;
pub const CHUNK_SIZE_MAX: usize = 1 << 20;

/// Glob every packet-filter log record must match before field parsing
pub const HIT_PATTERN: &str = "* IN=* OUT=* SRC=* ";

/// Ports below this value are privileged; hits on them against the firewall are serious
pub const PRIVILEGED_PORT_LIMIT: u32 = 1024;

/// Candidate system log locations, tried in order when none is configured
pub const DEFAULT_LOG_PATHS: &[&str] = &[
    "/var/log/messages",
    "/var/log/kernel",
    "/var/log/kern.log",
    "/var/log/syslog",
];

/// OS service database
pub const DEFAULT_SERVICES_PATH: &str = "/etc/services";

/// OS protocol-name database
pub const DEFAULT_PROTOCOLS_PATH: &str = "/etc/protocols";

/// Configuration file name under the user config directory
pub const CONFIG_DIR_NAME: &str = "hitlog";
pub const CONFIG_FILE_NAME: &str = "hitlog.toml";
