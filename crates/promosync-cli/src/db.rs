//! `db` sub-commands: connectivity check, migrations, partition seeding.

use clap::Subcommand;
use promosync_core::{AppConfig, SourcesFile};

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Register every source partition from the registry as a brand
    Seed,
}

pub(crate) async fn run_db_command(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = promosync_db::connect_from_config(config).await?;

    match command {
        DbCommands::Ping => {
            promosync_db::ping(&pool).await?;
            println!("database: ok");
        }
        DbCommands::Migrate => {
            let applied = promosync_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
        DbCommands::Seed => {
            let sources = promosync_core::load_sources(&config.sources_path)?;
            let partitions = partition_names(&sources);
            let seeded = promosync_db::seed_partitions(&pool, &partitions).await?;
            tracing::info!(seeded, "partitions seeded");
            println!("partitions seeded: {seeded} [{}]", partitions.join(", "));
        }
    }

    Ok(())
}

/// Distinct partition names in registry order, disabled sources included.
pub(crate) fn partition_names(sources: &SourcesFile) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for source in &sources.sources {
        let partition = source.partition.trim();
        if !names.iter().any(|n| n == partition) {
            names.push(partition.to_string());
        }
    }
    names
}
