//! tfs2git - TFS to Git migration CLI
//!
//! One-shot, operator-attended migration of a TFS repository into a Git
//! remote via git-tfs, with per-branch verification and a persisted audit
//! report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod exit_codes;
mod prompt;

/// tfs2git - TFS to Git migration CLI
#[derive(Parser, Debug)]
#[command(name = "tfs2git")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate a TFS repository to a Git remote with verification
    Migrate(commands::migrate::MigrateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).context("invalid log level")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Migrate(args) => {
            // Migration uses specific exit codes: 0=completed or cancelled,
            // 1=precondition failure, 2=invalid selection input. We use
            // std::process::exit to bypass anyhow Result handling and ensure
            // precise exit codes are returned.
            let exit_code = commands::migrate::run_migrate(&args);
            std::process::exit(i32::from(exit_code));
        },
    }
}
