mod scout;

use artcrm_core::{Category, ModelBackend};
use artcrm_scout::pipeline::DEFAULT_RADIUS_KM;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "artcrm-cli")]
#[command(about = "Art CRM lead discovery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Discover venues in a city and add them to the contact store
    Scout(ScoutArgs),
    /// Apply pending database migrations
    Migrate,
}

#[derive(Debug, Args)]
struct ScoutArgs {
    #[arg(long)]
    city: String,

    #[arg(long, default_value = "DE")]
    country: String,

    /// Comma-separated; defaults to gallery,cafe,coworking
    #[arg(long, value_delimiter = ',')]
    categories: Vec<Category>,

    #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
    radius_km: f64,

    /// claude, deepseek-chat or deepseek-reasoner
    #[arg(long, default_value = "deepseek-chat")]
    model: ModelBackend,

    /// Skip Google Places
    #[arg(long)]
    no_google: bool,

    /// Skip the OpenStreetMap fallback
    #[arg(long)]
    no_osm: bool,

    /// Fill empty contact fields on duplicates instead of skipping them
    #[arg(long)]
    update_existing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = artcrm_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = artcrm_db::connect_pool(
        &config.database_url,
        artcrm_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match cli.command {
        Commands::Migrate => {
            let applied = artcrm_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Scout(args) => {
            artcrm_db::run_migrations(&pool).await?;
            scout::run_scout(pool, &config, args).await?;
        }
    }

    Ok(())
}
