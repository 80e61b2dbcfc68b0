use clap::Parser;
use pattern_ledger::cli::output::OutputMode;
use pattern_ledger::cli::{commands, Cli, Commands};
use pattern_ledger::config::AppConfig;
use pattern_ledger::PatternStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match AppConfig::load_from(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!(
                "Warning: failed to load config from {} ({e}), using defaults",
                cli.config.display()
            );
            AppConfig::default_config(cli.mode.unwrap_or_default(), cli.data_dir.clone())
        }
    };
    if let Some(mode) = cli.mode {
        config.ledger.mode = mode;
    }
    if let Some(dir) = &cli.data_dir {
        config.ledger.data_dir = dir.clone();
    }
    if cli.no_persist {
        config.ledger.persistence_enabled = false;
    }

    match &cli.command {
        Commands::Run => init_logging(&config.logging),
        _ => init_logging_simple(),
    }

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("config: {e}");
        }
        anyhow::bail!("invalid configuration: {}", errors.join("; "));
    }

    let store = PatternStore::open(&config.ledger)?;

    match cli.command {
        Commands::Record { file } => commands::run_record(&store, file.as_deref())?,
        Commands::Query { snapshot, json } => {
            commands::run_query(&store, &snapshot, OutputMode::from_json_flag(json))?
        }
        Commands::Stats { json } => commands::run_stats(&store, OutputMode::from_json_flag(json))?,
        Commands::Top { limit, json } => {
            commands::run_top(&store, limit, OutputMode::from_json_flag(json))?
        }
        Commands::Prune { max_age_days } => commands::run_prune(&store, max_age_days)?,
        Commands::Export { out } => commands::run_export(&store, out.as_deref())?,
        Commands::Import { path } => commands::run_import(&store, &path)?,
        Commands::Reset { yes } => commands::run_reset(&store, yes)?,
        Commands::Run => {
            let prune_every = match config.ledger.prune_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
            info!(
                mode = %store.mode(),
                persistent = store.is_persistent(),
                "starting event loop"
            );
            commands::run_event_loop(Arc::new(store), prune_every).await?;
        }
    }

    Ok(())
}
