use anyhow::Result;
use axum::{ServiceExt, extract::Request, http::HeaderValue};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod analytics;
mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;


use auth::{JwtConfig, JwtService};
use common::database::DatabaseConfig;

use crate::{config::ServerConfig, state::AppState};

/// How often idle rate limiter entries are dropped
const LIMITER_PURGE_INTERVAL: Duration = Duration::from_secs(600);

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    info!("Starting gallery API");

    let app_config = config::load()?;
    let db_config = DatabaseConfig::from_env()?;
    let (stores, database) = common::connect(&db_config).await?;

    if let Some(database) = &database {
        if database.health_check().await? {
            info!("Database connection successful");
        } else {
            anyhow::bail!("Failed to connect to database");
        }
    }

    let jwt = JwtService::new(JwtConfig::from_env()?);
    let analytics = analytics::provider(&app_config.analytics);
    let state = AppState::new(&app_config, stores, jwt, analytics);

    let purge = state.limits.spawn_purge(LIMITER_PURGE_INTERVAL);

    let router = routes::create_router(state)
        .layer(cors_layer(&app_config.server))
        .layer(TraceLayer::new_for_http());
    let app = routes::normalize_paths(router);

    let host = &app_config.server.host;
    let port = app_config.server.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gallery API listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    purge.abort();
    if let Some(database) = database {
        database.close().await;
    }
    info!("Gallery API stopped");

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
