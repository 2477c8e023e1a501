use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

const DEFAULT_BASE_URL: &str = "https://www.tu-bryansk.ru";

#[derive(Parser, Debug, Clone)]
#[command(name = "bgtu-schedule")]
#[command(about = "Unofficial BSTU schedule API - scrapes the university schedule site and serves it as JSON")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        #[command(flatten)]
        config: Config,
    },
    /// Print the timetable of one group as JSON and exit
    Schedule {
        #[command(flatten)]
        config: Config,

        /// Full group name, e.g. "О-20-ИВТ-1-по-Б"
        #[arg(short, long)]
        group: String,
    },
    /// Print a teacher profile with timetable as JSON and exit
    Teacher {
        #[command(flatten)]
        config: Config,

        /// Full teacher name, e.g. "Трубаков Евгений Олегович"
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct Config {
    /// Root URL of the university site
    #[arg(long, env = "BGTU_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Port the API listens on (only used by `serve`)
    #[arg(long, env = "BGTU_PORT", default_value = "8443")]
    pub port: u16,

    /// Timeout of a single page fetch, in seconds
    #[arg(long, env = "BGTU_FETCH_TIMEOUT", default_value = "15")]
    pub fetch_timeout: u64,

    /// How long the active period is cached, in seconds (default: 7 days)
    #[arg(long, env = "BGTU_PERIOD_TTL", default_value = "604800")]
    pub period_ttl: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn period_ttl(&self) -> Duration {
        Duration::from_secs(self.period_ttl)
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!(
                "Invalid base URL '{}': must start with http:// or https://",
                self.base_url
            );
        }

        if self.fetch_timeout == 0 {
            bail!("Invalid fetch timeout: must be at least 1 second");
        }

        if self.period_ttl == 0 {
            bail!(
                "Invalid period TTL: must be at least 1 second.\n\
                 The active period changes twice a year, a TTL of days is reasonable."
            );
        }

        Ok(())
    }
}
