//! eqboard CLI
//!
//! Polls the configured earthquake feeds and posts to the board until stopped
//! with `q` + Enter or Ctrl-C.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eqboard::{
    error::Result,
    models::Config,
    pipeline::{Runner, StopSignal, listen_for_stop},
    storage::{AlertLog, InfoLog},
};

/// eqboard - Earthquake feeds to textboard threads
#[derive(Parser, Debug)]
#[command(
    name = "eqboard",
    version,
    about = "Posts JMA / P2P earthquake reports to a textboard"
)]
struct Cli {
    /// Path to the configuration file (JSON or TOML)
    #[arg(short, long, default_value = "eqboard.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the enabled feeds until stopped
    Run,

    /// Poll each enabled feed once and exit
    Once,

    /// Validate the configuration file
    Validate,

    /// Show the threads currently tracked in the logs
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?.normalize();
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run | Command::Once => {
            config.validate()?;
            config.prepare_logs()?;

            let config = Config {
                oneshot: config.oneshot || matches!(cli.command, Command::Once),
                ..config
            };
            let runner = Runner::from_config(&config)?;

            let stop = StopSignal::new();
            if !config.oneshot {
                listen_for_stop(&stop);
                log::info!("eqboard running, enter q to stop");
            }
            runner.run(stop).await;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let eq = &config.earthquake;
            let alerts = AlertLog::new(&eq.alert_log).ids().await?;
            log::info!(
                "Alert log {}: {} warnings posted",
                eq.alert_log.display(),
                alerts.len()
            );
            if let Some(latest) = alerts.first() {
                log::info!("Latest warning: {}", latest);
            }

            let records = InfoLog::new(&eq.info_log).records().await?;
            log::info!(
                "Info log {}: {} threads tracked",
                eq.info_log.display(),
                records.len()
            );
            for record in &records {
                log::info!(
                    "  {} [{}] {} ({} reports, last {})",
                    record.title,
                    record.prefs.iter().cloned().collect::<Vec<_>>().join(","),
                    record.url,
                    record.ids.len(),
                    record.date
                );
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
