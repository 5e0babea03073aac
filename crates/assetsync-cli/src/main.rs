mod matching;
mod snapshot;
mod sync;
mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "assetsync-cli")]
#[command(about = "Reconcile catalog attachments into product asset lists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full match, fetch, transform and persist pipeline.
    Sync {
        /// JSON export of the source catalog.
        #[arg(long)]
        source: PathBuf,
        /// Fetch and transform, but upload nothing and leave products untouched.
        #[arg(long)]
        dry_run: bool,
        /// Write the run report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Only read the first N catalog records.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print which products match a catalog record, without fetching anything.
    Match {
        #[arg(long)]
        source: PathBuf,
    },
    /// HEAD-check every asset URL currently stored on products.
    Verify {
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },
    /// Apply pending database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = assetsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = assetsync_db::PoolConfig::from_app_config(&config);
    let pool = assetsync_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Sync {
            source,
            dry_run,
            report,
            limit,
        } => {
            let args = sync::SyncArgs {
                source,
                dry_run,
                report,
                limit,
            };
            sync::run_sync(&config, pool, args).await
        }
        Commands::Match { source } => matching::run_match(pool, &source).await,
        Commands::Verify { concurrency } => {
            verify::run_verify(&pool, concurrency, &config.pipeline).await
        }
        Commands::Migrate => {
            assetsync_db::run_migrations(&pool).await?;
            println!("migrations applied");
            Ok(())
        }
    }
}
