use std::time::Duration;

use clap::Parser;

use crate::ingest::health::HealthEvaluator;
use crate::ingest::runner::RunnerSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobboard-ingest", about = "Job source ingestion pipeline")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Maximum number of sources fetched at the same time
    #[arg(long, env = "INGEST_CONCURRENCY", default_value = "5")]
    pub concurrency: usize,

    /// Per-source fetch deadline in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "45")]
    pub fetch_timeout_secs: u64,

    /// Age after which a successful run no longer counts as healthy
    #[arg(long, env = "HEALTH_STALE_AFTER_HOURS", default_value = "48")]
    pub stale_after_hours: i64,

    /// Successful runs a stored job may be missing from before it is closed
    #[arg(long, env = "MAX_MISSED_RUNS", default_value = "3")]
    pub max_missed_runs: i32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the admin API server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Run every enabled source once and exit
    RunAll,
    /// Run a single source once and exit
    Run {
        /// Job source id
        #[arg(long)]
        source: i32,
    },
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            concurrency: self.concurrency.max(1),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_missed_runs: self.max_missed_runs.max(1),
        }
    }

    pub fn health_evaluator(&self) -> HealthEvaluator {
        HealthEvaluator::new(chrono::Duration::hours(self.stale_after_hours))
    }
}
