//! Configuration file handling
//!
//! Settings live in a TOML file, by default `<config dir>/hitlog/hitlog.toml`.
//! Every section and key is optional; missing values take their defaults.
//! Command line flags are applied on top of the loaded file.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::classify::FilterSettings;
use crate::constants::{
    CHUNK_SIZE_MAX, CHUNK_SIZE_MIN, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_LOG_PATHS,
    DEFAULT_PROTOCOLS_PATH, DEFAULT_SERVICES_PATH, FILE_BUF, POLL_INTERVAL_MAX_MS,
    POLL_INTERVAL_MIN_MS, POLL_INTERVAL_MS,
};
use crate::parser::LinePattern;
use crate::tail::MonitorSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Cannot determine the user configuration directory")]
    NoConfigDir,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log: LogSettings,
    pub filter: FilterSettings,
    pub firewall: FirewallSettings,
    pub netdb: NetdbSettings,
}

/// Which log to read and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log file; guessed from the usual system locations when unset
    pub path: Option<PathBuf>,
    /// Poll period while following, in milliseconds (50-60000)
    pub poll_interval_ms: u64,
    /// Read size in bytes (1024-1048576)
    pub chunk_size: usize,
    /// Glob a line must match to be treated as a packet record
    pub pattern: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: None,
            poll_interval_ms: POLL_INTERVAL_MS,
            chunk_size: FILE_BUF,
            pattern: None,
        }
    }
}

/// How the firewall's own address is determined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallSettings {
    /// Interface facing the outside world, e.g. `eth0`
    pub external_interface: Option<String>,
    /// Fixed address; takes precedence over the interface lookup
    pub external_ip: Option<String>,
}

/// OS name databases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetdbSettings {
    pub services: PathBuf,
    pub protocols: PathBuf,
}

impl Default for NetdbSettings {
    fn default() -> Self {
        Self {
            services: PathBuf::from(DEFAULT_SERVICES_PATH),
            protocols: PathBuf::from(DEFAULT_PROTOCOLS_PATH),
        }
    }
}

impl Configuration {
    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the file at `path`, or the default location if it exists, or
    /// fall back to built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_config_path() {
            Ok(default) if default.exists() => Self::load_from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.log.poll_interval_ms;
        if !(POLL_INTERVAL_MIN_MS..=POLL_INTERVAL_MAX_MS).contains(&interval) {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms must be between {} and {}, got {}",
                POLL_INTERVAL_MIN_MS, POLL_INTERVAL_MAX_MS, interval
            )));
        }

        let chunk = self.log.chunk_size;
        if !(CHUNK_SIZE_MIN..=CHUNK_SIZE_MAX).contains(&chunk) {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be between {} and {}, got {}",
                CHUNK_SIZE_MIN, CHUNK_SIZE_MAX, chunk
            )));
        }

        if let Some(pattern) = &self.log.pattern {
            LinePattern::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("pattern '{}' is not a valid glob: {}", pattern, e))
            })?;
        }

        if let Some(ip) = &self.firewall.external_ip {
            ip.parse::<std::net::Ipv4Addr>().map_err(|_| {
                ConfigError::Invalid(format!("external_ip '{}' is not an IPv4 address", ip))
            })?;
        }

        Ok(())
    }

    /// `<config dir>/hitlog/hitlog.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// The configured log if it exists, else the first of the usual
    /// system logs that does
    pub fn resolve_log_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.log.path {
            if path.is_file() {
                return Some(path.clone());
            }
            warn!("Configured log {} not found; trying system logs", path.display());
        }
        guess_system_log()
    }

    /// Engine tunables derived from the `[log]` section
    pub fn monitor_settings(&self) -> Result<MonitorSettings, ConfigError> {
        let pattern = match &self.log.pattern {
            Some(glob) => LinePattern::new(glob)
                .map_err(|e| ConfigError::Invalid(format!("pattern '{}': {}", glob, e)))?,
            None => LinePattern::hits(),
        };
        Ok(MonitorSettings {
            poll_interval: Duration::from_millis(self.log.poll_interval_ms),
            chunk_size: self.log.chunk_size,
            pattern,
        })
    }
}

/// First existing file among the usual system log locations
pub fn guess_system_log() -> Option<PathBuf> {
    first_existing(DEFAULT_LOG_PATHS.iter().map(PathBuf::from))
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Configuration::from_toml("").unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.log.poll_interval_ms, 500);
        assert_eq!(config.log.chunk_size, 4096);
        assert!(!config.filter.skip_redundant);
        assert_eq!(config.netdb.services, PathBuf::from("/etc/services"));
    }

    #[test]
    fn test_full_file() {
        let config = Configuration::from_toml(
            r#"
            [log]
            path = "/var/log/firewall"
            poll_interval_ms = 250
            chunk_size = 8192

            [filter]
            skip_redundant = true
            skip_not_for_firewall = true

            [firewall]
            external_interface = "eth1"
            external_ip = "198.51.100.9"
            "#,
        )
        .unwrap();

        assert_eq!(config.log.path, Some(PathBuf::from("/var/log/firewall")));
        assert_eq!(config.log.poll_interval_ms, 250);
        assert!(config.filter.skip_redundant);
        assert!(config.filter.skip_not_for_firewall);
        assert_eq!(config.firewall.external_interface.as_deref(), Some("eth1"));

        let settings = config.monitor_settings().unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.chunk_size, 8192);
    }

    #[test]
    fn test_validation_bounds() {
        assert!(Configuration::from_toml("[log]\npoll_interval_ms = 10").is_err());
        assert!(Configuration::from_toml("[log]\npoll_interval_ms = 60001").is_err());
        assert!(Configuration::from_toml("[log]\nchunk_size = 16").is_err());
        assert!(Configuration::from_toml("[log]\nchunk_size = 64").is_err());
        assert!(Configuration::from_toml("[log]\nchunk_size = 1023").is_err());
        assert!(Configuration::from_toml("[log]\nchunk_size = 1024").is_ok());
        assert!(Configuration::from_toml("[firewall]\nexternal_ip = \"eth0\"").is_err());
        assert!(Configuration::from_toml("[log]\npattern = \"[\"").is_err());
    }

    #[test]
    fn test_custom_pattern() {
        let config = Configuration::from_toml("[log]\npattern = \"*PROTO=UDP*\"").unwrap();
        let settings = config.monitor_settings().unwrap();
        assert!(settings.pattern.matches("x PROTO=UDP y"));
        assert!(!settings.pattern.matches("x PROTO=TCP y"));
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hitlog.toml");
        std::fs::write(&path, "[log\n").unwrap();

        let err = Configuration::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("hitlog.toml"));

        let missing = Configuration::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn test_configured_log_path_used_when_present() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("firewall.log");
        std::fs::write(&log, "").unwrap();

        let mut config = Configuration::default();
        config.log.path = Some(log.clone());
        assert_eq!(config.resolve_log_path(), Some(log));

        // A missing configured log falls back to the system guess
        config.log.path = Some(dir.path().join("gone.log"));
        assert_eq!(config.resolve_log_path(), guess_system_log());
    }

    #[test]
    fn test_first_existing_log() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("kern.log");
        std::fs::write(&present, "").unwrap();

        let found = first_existing(vec![dir.path().join("messages"), present.clone()]);
        assert_eq!(found, Some(present));
        assert_eq!(first_existing(vec![dir.path().join("nothing")]), None);
    }

    #[test]
    fn test_default_config_path_shape() {
        if let Ok(path) = Configuration::default_config_path() {
            assert!(path.ends_with("hitlog/hitlog.toml"));
        }
    }
}
