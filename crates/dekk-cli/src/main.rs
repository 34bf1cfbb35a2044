mod runs;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dekk-cli")]
#[command(about = "Dekk supplier feed sync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch both supplier feeds and reconcile them into the catalog
    Sync {
        /// Compute and report changes without writing to the catalog
        #[arg(long)]
        dry_run: bool,
        /// Products per batch (defaults to DEKK_SYNC_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Leave entries missing from the feeds untouched
        #[arg(long)]
        skip_obsolete: bool,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Show recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Verify the database is reachable
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("dekk-cli: no command given; see --help");
        return Ok(());
    };

    let config = dekk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dekk_db::PoolConfig::from_app_config(&config);
    let pool = dekk_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Sync {
            dry_run,
            batch_size,
            skip_obsolete,
        } => {
            let args = sync::SyncArgs {
                dry_run,
                batch_size,
                skip_obsolete,
            };
            sync::run_sync_command(pool, &config, args).await?;
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = dekk_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            dekk_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Runs { limit } => runs::list_runs(&pool, limit).await?,
    }

    Ok(())
}
