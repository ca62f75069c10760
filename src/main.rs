#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use log::info;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use hitlog::cli::{self, RunConfig};
use hitlog::constants::APP_SUBSYSTEM;
use hitlog::netif;
use hitlog::output::progress::ReloadProgress;
use hitlog::output::{self, ConsoleSink, OutputFormat};
use hitlog::{Classifier, Configuration, HitJournal, HitParser, LogMonitor, ServiceResolver};

type Monitor = LogMonitor<ConsoleSink<std::io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let run = cli::parse_args()?;
    init_logging(run.quiet_mode);

    let mut config = Configuration::load_or_default(run.config_path.as_deref())
        .context("Failed to load configuration")?;
    run.apply_to(&mut config);
    config.validate().context("Invalid command line override")?;

    let log_path = run
        .log_path
        .clone()
        .or_else(|| config.resolve_log_path())
        .ok_or_else(|| anyhow!("No system log found; pass LOGFILE or set [log] path"))?;

    let resolver = Arc::new(ServiceResolver::new(
        &config.netdb.services,
        &config.netdb.protocols,
    ));
    let classifier = Classifier::new(config.filter, netif::resolve_firewall_ip(&config.firewall));
    let format = if run.json_output {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let sink = ConsoleSink::stdout(format, run.save_path.is_some());
    let mut monitor = LogMonitor::new(
        HitJournal::new(classifier, sink),
        HitParser::new(resolver),
        config.monitor_settings()?,
    );

    let mut interrupted = false;
    if run.mode.reloads() {
        interrupted = reload(&mut monitor, &log_path, &run).await?;
    }
    if run.mode.follows() && !interrupted {
        follow(&mut monitor, &log_path).await?;
    }
    monitor.cancel();

    if let Some(path) = &run.save_path {
        let saved = monitor.with_journal(|journal| {
            let hits = journal.sink().recorded();
            output::save_events(path, hits).map(|_| hits.len())
        })?;
        info!("Saved {} events to {}", saved, path.display());
    }

    Ok(())
}

fn init_logging(quiet: bool) {
    let level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", APP_SUBSYSTEM, level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read the whole log once. Returns `true` if interrupted by Ctrl+C.
async fn reload(monitor: &mut Monitor, path: &Path, run: &RunConfig) -> Result<bool> {
    monitor.begin_reload(path).await?;

    // Only draw progress when hits are not going to the same terminal
    let show_progress = !run.quiet_mode
        && std::io::stderr().is_terminal()
        && !std::io::stdout().is_terminal();
    let mut progress = ReloadProgress::new(format!("Reading {}", path.display()), !show_progress);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    while monitor.is_busy() {
        tokio::select! {
            _ = &mut ctrl_c => {
                monitor.cancel();
                progress.finish();
                info!("Interrupted");
                return Ok(true);
            }
            _ = ticker.tick() => {
                let printed = monitor.with_journal(|journal| journal.sink().printed());
                progress.update(monitor.reload_progress(), printed);
            }
        }
    }

    monitor
        .wait_reload()
        .await
        .with_context(|| format!("Reading {} failed", path.display()))?;

    let (printed, counters) =
        monitor.with_journal(|journal| (journal.sink().printed(), journal.counters()));
    progress.complete(printed);

    if !run.quiet_mode {
        let summary = output::format_summary(&counters);
        if run.json_output {
            eprintln!("{}", summary);
        } else {
            println!("{}", summary);
        }
    }
    Ok(false)
}

/// Follow the log until Ctrl+C or a stream error
async fn follow(monitor: &mut Monitor, path: &Path) -> Result<()> {
    monitor.begin_tail(path).await?;
    info!("Following {}; press Ctrl+C to stop", path.display());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted");
        }
        result = monitor.wait_tail() => {
            result.with_context(|| format!("Stopped following {}", path.display()))?;
        }
    }
    Ok(())
}
