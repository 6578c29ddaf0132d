//! Shared library for the gallery services
//!
//! Holds the data model, the listing query layer and the stores behind
//! it, plus the PostgreSQL connection handle and store errors.

pub mod database;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use store::{AlbumStore, FileStore, Stores, UserStore};

/// Connect the store selected by `config`
///
/// `DATABASE_URL=memory` yields a fresh memory store and no handle;
/// anything else opens a pool and applies migrations.
///
/// ```rust,no_run
/// use common::database::DatabaseConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let (stores, database) = common::connect(&config).await?;
///     if let Some(database) = database {
///         println!("Database health check: {}", database.health_check().await?);
///         database.close().await;
///     }
///     drop(stores);
///     Ok(())
/// }
/// ```
pub async fn connect(
    config: &database::DatabaseConfig,
) -> DatabaseResult<(Stores, Option<database::Database>)> {
    if config.is_memory() {
        tracing::info!("Using the in-memory store");
        return Ok((Stores::memory(), None));
    }

    let database = database::Database::connect(config).await?;
    database.migrate().await?;
    let stores = Stores::new(store::PgStore::new(database.pool().clone()));
    Ok((stores, Some(database)))
}
