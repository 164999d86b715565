use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::{repositories::CatalogRepository, seed::load_catalog};
use common::{
    database::{DatabaseConfig, init_pool},
    error::DatabaseError,
};

#[derive(Parser)]
#[command(name = "load_instruments")]
#[command(about = "Load instrument categories and instruments from CSV", long_about = None)]
struct Args {
    /// Directory holding instrument_categories.csv and instruments.csv
    #[arg(short, long, value_name = "DIR", default_value = "data")]
    data: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    let report = load_catalog(&CatalogRepository::new(pool), &args.data).await?;
    info!(
        "Added {} categories and {} instruments from {:?}",
        report.categories, report.instruments, args.data
    );

    Ok(())
}
