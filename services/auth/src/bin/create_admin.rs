//! Create the gallery administrator
//!
//! Reads `ADMIN_EMAIL` and the database settings from the environment,
//! creates the admin user with a generated password if no user has that
//! email yet, and prints the credentials once.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::validation::validate_email;
use auth::{generate_password, hash_password};
use common::database::DatabaseConfig;
use common::models::{NewUser, Role};

const GENERATED_PASSWORD_LENGTH: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let email = std::env::var("ADMIN_EMAIL").context("ADMIN_EMAIL environment variable not set")?;
    validate_email(&email).map_err(anyhow::Error::msg)?;

    let db_config = DatabaseConfig::from_env()?;
    if db_config.is_memory() {
        anyhow::bail!("create-admin needs a PostgreSQL DATABASE_URL, the memory store is not persisted");
    }

    let (stores, database) = common::connect(&db_config).await?;

    if stores.users.find_by_email(&email).await?.is_some() {
        info!("Admin user already created.");
    } else {
        let password = generate_password(GENERATED_PASSWORD_LENGTH);
        let password_hash = hash_password(password.clone()).await?;

        let user = stores
            .users
            .insert(NewUser {
                first_name: "Admin".to_string(),
                last_name: String::new(),
                role: Role::Admin,
                email,
                password_hash,
            })
            .await?;

        info!("Created admin user {}", user.id);
        println!("Credentials: {} {}", user.email, password);
    }

    if let Some(database) = database {
        database.close().await;
    }

    Ok(())
}
