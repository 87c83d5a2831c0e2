use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use pmharvest::{Harvester, HarvesterArgs, WriterSink};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Keeps request urls visible under a stricter `RUST_LOG`.
const VERBOSE_DIRECTIVE: &str = "pmharvest=info";

/// OAI-PMH harvester
#[derive(Debug, Parser)]
#[command(name = "pmharvest")]
#[command(about = "OAI-PMH harvester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest every page of a list request and print each payload
    #[command(arg_required_else_help = true)]
    Harvest(HarvesterArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Harvest(cfg) => cfg.verbose,
        }
    }
}

fn env_filter(base: EnvFilter, verbose: bool) -> anyhow::Result<EnvFilter> {
    if verbose {
        Ok(base.add_directive(VERBOSE_DIRECTIVE.parse()?))
    } else {
        Ok(base)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first, then .env.local can override
    let _ = dotenvy::from_filename_override(".env");
    let _ = dotenvy::from_filename_override(".env.local");

    let args = Cli::parse();

    // Payloads go to stdout, so logs go to stderr
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(base, args.command.verbose())?)
        .init();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received interrupt, finishing current page...");
        shutdown_clone.store(true, Ordering::Relaxed);
    });

    match args.command {
        Commands::Harvest(cfg) => {
            info!("Harvesting records from {}", cfg.endpoint);

            let config = cfg.into_config()?;
            let harvester = Harvester::new(config, shutdown.clone())?;
            let mut sink = WriterSink::stdout();
            harvester.run(&mut sink).await?;
        }
    }

    Ok(())
}
