//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Log file selection and run mode (reload, follow, tail only)
//! - Output format selection (human/JSON) and quiet mode
//! - Configuration file and per-run overrides
//! - Saving accepted events to a file

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::config::Configuration;

/// Version string reported by `--version`
pub const VERSION: &str = concat!(env!("HITLOG_BUILD_VERSION"), " (", env!("GIT_HASH"), ")");

/// What the binary does with the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Read the whole log once and exit
    Reload,
    /// Read the whole log, then keep following it
    ReloadAndFollow,
    /// Only follow new records
    Follow,
}

impl RunMode {
    pub fn reloads(self) -> bool {
        matches!(self, RunMode::Reload | RunMode::ReloadAndFollow)
    }

    pub fn follows(self) -> bool {
        matches!(self, RunMode::ReloadAndFollow | RunMode::Follow)
    }
}

/// Everything a single invocation asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Log given on the command line; wins over the configuration file
    pub log_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub mode: RunMode,
    pub json_output: bool,
    pub quiet_mode: bool,
    pub save_path: Option<PathBuf>,
    pub interface: Option<String>,
    pub firewall_ip: Option<String>,
    pub skip_redundant: bool,
    pub only_mine: bool,
}

impl RunConfig {
    /// Apply the command line overrides to a loaded configuration.
    /// The log path is not among them: an explicit log is used as given.
    pub fn apply_to(&self, config: &mut Configuration) {
        if let Some(iface) = &self.interface {
            config.firewall.external_interface = Some(iface.clone());
        }
        if let Some(ip) = &self.firewall_ip {
            config.firewall.external_ip = Some(ip.clone());
        }
        if self.skip_redundant {
            config.filter.skip_redundant = true;
        }
        if self.only_mine {
            config.filter.skip_not_for_firewall = true;
        }
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("hitlog")
        .version(VERSION)
        .about("Show packet-filter hits from the kernel log")
        .long_about(
            "Reads the kernel log, picks out the records written by the packet filter's \
             LOG rules and reports each hit with its resolved service, flagging hits on \
             privileged ports of the firewall itself.",
        )
        .arg(
            Arg::new("logfile")
                .value_name("LOGFILE")
                .help("Log file to read (default: from config, else the usual system logs)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .value_name("FILE")
                .help("Log file to read; same as the positional LOGFILE")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with("logfile"),
        )
        .arg(
            Arg::new("follow")
                .short('f')
                .long("follow")
                .help("Keep following the log after reading it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tail-only")
                .long("tail-only")
                .help("Skip the initial read and only show new records")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output one JSON object per hit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress progress and the summary line")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: <config dir>/hitlog/hitlog.toml)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("save")
                .long("save")
                .value_name("FILE")
                .help("Write accepted events to FILE on exit")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("interface")
                .long("interface")
                .value_name("IFACE")
                .help("External interface whose address identifies the firewall"),
        )
        .arg(
            Arg::new("firewall-ip")
                .long("firewall-ip")
                .value_name("ADDR")
                .help("Firewall's external IPv4 address (skips the interface lookup)"),
        )
        .arg(
            Arg::new("skip-redundant")
                .long("skip-redundant")
                .help("Hide a hit identical to the one before it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("only-mine")
                .long("only-mine")
                .help("Hide inbound hits not addressed to the firewall")
                .action(ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<RunConfig> {
    run_config_from(&build_command().get_matches())
}

pub fn run_config_from(matches: &ArgMatches) -> Result<RunConfig> {
    let mode = if matches.get_flag("tail-only") {
        RunMode::Follow
    } else if matches.get_flag("follow") {
        RunMode::ReloadAndFollow
    } else {
        RunMode::Reload
    };

    let firewall_ip = matches.get_one::<String>("firewall-ip").cloned();
    if let Some(ip) = &firewall_ip {
        ip.parse::<std::net::Ipv4Addr>()
            .map_err(|_| anyhow!("Not an IPv4 address: {}", ip))?;
    }

    let log_path = matches
        .get_one::<PathBuf>("logfile")
        .or_else(|| matches.get_one::<PathBuf>("log"))
        .cloned();

    Ok(RunConfig {
        log_path,
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        mode,
        json_output: matches.get_flag("json"),
        quiet_mode: matches.get_flag("quiet"),
        save_path: matches.get_one::<PathBuf>("save").cloned(),
        interface: matches.get_one::<String>("interface").cloned(),
        firewall_ip,
        skip_redundant: matches.get_flag("skip-redundant"),
        only_mine: matches.get_flag("only-mine"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RunConfig> {
        let matches = build_command().try_get_matches_from(args)?;
        run_config_from(&matches)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["hitlog"]).unwrap();
        assert_eq!(config.mode, RunMode::Reload);
        assert_eq!(config.log_path, None);
        assert!(!config.json_output);
        assert!(!config.quiet_mode);
        assert!(!config.skip_redundant);
    }

    #[test]
    fn test_modes() {
        assert_eq!(parse(&["hitlog", "-f"]).unwrap().mode, RunMode::ReloadAndFollow);
        assert_eq!(parse(&["hitlog", "--tail-only"]).unwrap().mode, RunMode::Follow);
        assert_eq!(parse(&["hitlog", "-f", "--tail-only"]).unwrap().mode, RunMode::Follow);
        assert!(RunMode::Reload.reloads() && !RunMode::Reload.follows());
        assert!(!RunMode::Follow.reloads() && RunMode::Follow.follows());
    }

    #[test]
    fn test_log_path_forms() {
        let positional = parse(&["hitlog", "/var/log/kern.log"]).unwrap();
        assert_eq!(positional.log_path, Some(PathBuf::from("/var/log/kern.log")));

        let flag = parse(&["hitlog", "--log", "/tmp/fw.log"]).unwrap();
        assert_eq!(flag.log_path, Some(PathBuf::from("/tmp/fw.log")));

        assert!(parse(&["hitlog", "--log", "/a", "/b"]).is_err());
    }

    #[test]
    fn test_firewall_ip_validated() {
        assert!(parse(&["hitlog", "--firewall-ip", "198.51.100.9"]).is_ok());
        assert!(parse(&["hitlog", "--firewall-ip", "eth0"]).is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let run = parse(&[
            "hitlog",
            "--log",
            "/tmp/fw.log",
            "--interface",
            "eth1",
            "--skip-redundant",
            "--only-mine",
        ])
        .unwrap();

        let mut config = Configuration::default();
        run.apply_to(&mut config);
        assert_eq!(config.log.path, None);
        assert_eq!(config.firewall.external_interface.as_deref(), Some("eth1"));
        assert!(config.filter.skip_redundant);
        assert!(config.filter.skip_not_for_firewall);
    }

    #[test]
    fn test_overrides_never_clear_file_settings() {
        let mut config = Configuration::default();
        config.filter.skip_redundant = true;
        parse(&["hitlog"]).unwrap().apply_to(&mut config);
        assert!(config.filter.skip_redundant);
    }

    #[test]
    fn test_version_string() {
        assert!(VERSION.contains('('));
    }
}
