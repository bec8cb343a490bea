mod db;
mod dump;
mod summary;
mod sync;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::db::DbCommands;

#[derive(Debug, Parser)]
#[command(name = "promosync")]
#[command(about = "Convenience-store promotion crawler and snapshot sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl sources and reconcile their promotions with the store
    Sync {
        /// Source name from the registry, or `all` for every enabled source
        #[arg(default_value = "all")]
        selector: String,

        /// Compute what would change without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Also write the JSON run summary to this file
        #[arg(long, value_name = "PATH")]
        summary_path: Option<PathBuf>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = promosync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "configuration loaded");

    match command {
        Commands::Sync {
            selector,
            dry_run,
            summary_path,
        } => {
            let summary =
                sync::run_sync_command(&config, &selector, dry_run, summary_path.as_deref())
                    .await?;
            let failed = summary.failed_sources();
            if !failed.is_empty() {
                anyhow::bail!("sync failed for: {}", failed.join(", "));
            }
        }
        Commands::Db { command } => db::run_db_command(&config, command).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
