//! Alert scraper CLI - collects Ops Manager alerts into an append-only log.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alert_scraper::{
    AlertFetcher, AppendLogWriter, Credentials, Endpoints, OpsManagerClient, Scheduler,
    ScraperConfig, StartupError,
};

/// Ops Manager alert scraper - polls open alerts and appends new ones to a log.
#[derive(Parser)]
#[command(name = "alert-scraper")]
#[command(about = "Ops Manager alert scraper")]
#[command(version)]
struct Cli {
    /// Ops Manager base URL
    #[arg(long, env = "OM_BASE_URL")]
    url: String,

    /// Ops Manager API public key
    #[arg(long = "pub-key", env = "OM_PUBLIC_KEY")]
    pub_key: String,

    /// Ops Manager API private key
    #[arg(long = "priv-key", env = "OM_PRIVATE_KEY", hide_env_values = true)]
    priv_key: String,

    /// Configuration YAML file
    #[arg(long, default_value = "alert-scraper.yml")]
    cfg: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogOutput,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum LogOutput {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(cli).await {
        Ok(()) => {
            info!("bye ...");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Alert scraper failed to start");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: bool, output: LogOutput) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("alert_scraper=debug,info")
        } else {
            EnvFilter::new("alert_scraper=info,warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match output {
        LogOutput::Text => registry.with(fmt::layer()).init(),
        LogOutput::Json => registry.with(fmt::layer().json()).init(),
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = ScraperConfig::from_file(&cli.cfg)?;
    info!(cfg = %cli.cfg.display(), "Configuration loaded");

    let endpoints = Endpoints::new(&cli.url, &config.project_id);
    let client = OpsManagerClient::new(&config.link, Credentials::new(cli.pub_key, cli.priv_key))?;
    let fetcher = AlertFetcher::new(Arc::new(client), endpoints);

    fetcher.verify_project(&config.project_name).await?;
    info!(
        project = %config.project_name,
        output = %config.alert_file.display(),
        "Scraping alerts for project"
    );

    let writer = AppendLogWriter::new(
        &config.alert_file,
        &config.id_file,
        &config.project_name,
        config.log_format,
    );
    let mut scheduler = Scheduler::start(fetcher, writer, config.period)?;
    scheduler.run_until(shutdown_signal()).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
