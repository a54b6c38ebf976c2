//! Database Access Grant Resolver
//!
//! Expands database and user documents into concrete per-user grants.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sari::{
    AppConfig, Resolution,
    config::{LogFormat, load_config},
    credentials::{DefaultPasswordResolver, resolve_master_passwords},
    report::{OutputFormat, render},
    scheduler::{Pass, run_watch},
};
use std::ffi::OsString;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Database access grant resolver
#[derive(Parser, Debug)]
#[command(name = "sari")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "SARI_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long, env = "SARI_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format; overrides logging.format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration, master passwords and grants
    Check,

    /// Resolve grants once and print them
    Resolve {
        /// Instant to evaluate validity windows at (RFC 3339, default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Do not resolve database master passwords
        #[arg(long)]
        skip_secrets: bool,
    },

    /// Re-resolve grants whenever a validity window opens or closes
    Watch {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Do not resolve database master passwords
        #[arg(long)]
        skip_secrets: bool,
    },
}

/// Load `.env` (the given file, or the usual lookup) and parse arguments.
///
/// The dotenv file is applied first so that clap's env fallbacks
/// (`SARI_CONFIG`, `SARI_LOG_LEVEL`) see its values.
fn load_args<I, T>(dotenv_path: Option<&Path>, argv: I) -> Args
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _ = match dotenv_path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Args::parse_from(argv)
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Resolve master passwords (unless skipped) and grants at `at`
async fn run_pass(
    config: &AppConfig,
    at: DateTime<Utc>,
    skip_secrets: bool,
) -> anyhow::Result<Resolution> {
    if !skip_secrets {
        let resolver = DefaultPasswordResolver::for_databases(&config.databases).await;
        let passwords = resolve_master_passwords(&config.databases, &resolver).await?;
        info!(databases = passwords.len(), "Resolved master passwords");
    }
    Ok(sari::resolve(config, at)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = load_args(None, std::env::args_os());

    let loaded = load_config(args.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_logging(
        args.log_level.as_deref().unwrap_or(&logging.level),
        args.log_format.unwrap_or(logging.format),
    );

    info!(version = env!("CARGO_PKG_VERSION"), "Starting sari");

    let config =
        loaded.inspect_err(|e| error!(error = %e, "Failed to load configuration"))?;

    match args.command {
        Command::Check => {
            let resolution = run_pass(&config, Utc::now(), false)
                .await
                .inspect_err(|e| error!(error = %e, "Check failed"))?;
            println!(
                "OK: {} databases, {} users, {} grants",
                config.databases.len(),
                resolution.users.len(),
                resolution.grant_count()
            );
        }
        Command::Resolve {
            at,
            format,
            skip_secrets,
        } => {
            let resolution = run_pass(&config, at.unwrap_or_else(Utc::now), skip_secrets)
                .await
                .inspect_err(|e| error!(error = %e, "Resolution failed"))?;
            print!("{}", render(&resolution, format)?);
        }
        Command::Watch {
            format,
            skip_secrets,
        } => {
            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                    on_signal.cancel();
                }
            });

            let config_path = args.config.clone();

            run_watch(
                |now| {
                    let config_path = config_path.clone();
                    async move {
                        // Every pass reloads the whole document, [scheduler] included
                        let config = load_config(config_path.as_deref())?;
                        let resolution = run_pass(&config, now, skip_secrets).await?;
                        print!("{}", render(&resolution, format)?);
                        anyhow::Ok(Pass {
                            resolution,
                            scheduler: config.scheduler,
                        })
                    }
                },
                config.scheduler.clone(),
                shutdown,
            )
            .await?;
        }
    }

    Ok(())
}
