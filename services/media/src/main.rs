use anyhow::Result;
use common::database::DatabaseConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod ingest;
mod metadata;
mod settings;

use ingest::Ingestor;
use settings::IngestSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting gallery ingestion");

    let settings = IngestSettings::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    if db_config.is_memory() {
        warn!("DATABASE_URL=memory: ingested records are lost when this process exits");
    }
    let (stores, database) = common::connect(&db_config).await?;

    let ingestor = Ingestor::new(stores, settings.gallery_dir);

    let outcome = match settings.schedule {
        None => ingestor.run().await.map(|_| ()),
        Some(schedule) => run_scheduled(&ingestor, &schedule).await,
    };

    if let Some(database) = database {
        database.close().await;
    }
    info!("Gallery ingestion stopped");

    outcome
}

async fn run_scheduled(ingestor: &Ingestor, schedule: &str) -> Result<()> {
    let mut scheduler = ingestor.schedule(schedule).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping scheduler...");
    scheduler.shutdown().await?;
    Ok(())
}
