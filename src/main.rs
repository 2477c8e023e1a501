mod config;
mod directory;
mod error;
mod fetch;
mod models;
mod period;
mod service;
mod timetable;
mod web;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{Cli, Command, Config};
use fetch::HttpFetcher;
use service::ScheduleService;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    let result = match cli.command {
        Command::Serve { config } => run_serve(config).await,
        Command::Schedule { config, group } => run_schedule(config, group).await,
        Command::Teacher { config, name } => run_teacher(config, name).await,
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(config: Config) -> Result<()> {
    init_logging(config.verbose);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting BSTU schedule API"
    );
    log_config(&config);

    let service = build_service(&config)?;
    let router = web::create_router(service);
    web::start_server(router, config.port).await
}

async fn run_schedule(config: Config, group: String) -> Result<()> {
    init_logging(config.verbose);
    config.validate()?;
    log_config(&config);

    let service = build_service(&config)?;
    let timetable = service
        .schedule(&group)
        .await
        .with_context(|| format!("Failed to build schedule of group '{}'", group))?;

    print_json(&timetable)
}

async fn run_teacher(config: Config, name: String) -> Result<()> {
    init_logging(config.verbose);
    config.validate()?;
    log_config(&config);

    let service = build_service(&config)?;
    let profile = service
        .teacher(&name)
        .await
        .with_context(|| format!("Failed to build profile of teacher '{}'", name))?;

    print_json(&profile)
}

fn build_service(config: &Config) -> Result<ScheduleService> {
    let fetcher = HttpFetcher::new(&config.base_url, config.fetch_timeout())
        .context("Failed to set up the page fetcher")?;

    Ok(ScheduleService::new(
        Arc::new(fetcher),
        &config.base_url,
        config.period_ttl(),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

/// `RUST_LOG` wins over `--verbose` when set.
fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn log_config(config: &Config) {
    info!(
        base_url = %config.base_url,
        port = config.port,
        fetch_timeout_secs = config.fetch_timeout,
        period_ttl_secs = config.period_ttl,
        "Core configuration"
    );
}
