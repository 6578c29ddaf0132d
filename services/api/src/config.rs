//! Server configuration
//!
//! Defaults, overridden by `GALLERY__<SECTION>__<KEY>` environment
//! variables (a `.env` file is loaded first). Database and token settings
//! are read by their own `from_env` constructors.

use serde::Deserialize;
use std::time::Duration;

use auth::RateLimiterConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma separated list of allowed origins; empty allows any origin
    pub cors_origins: String,
}

impl ServerConfig {
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// What happens to an album's files when the album is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Keep the files, unlinked
    Detach,
    /// Delete the files too
    Cascade,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumsConfig {
    pub delete_policy: DeletePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
    pub ban_threshold: u32,
    pub ban_seconds: u64,
}

impl RateLimitConfig {
    /// Limiter settings for the global limit
    pub fn limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_seconds),
            ban_threshold: self.ban_threshold,
            ban_duration: Duration::from_secs(self.ban_seconds),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsConfig {
    /// GA4 property id; analytics are disabled when unset
    pub property_id: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub albums: AlbumsConfig,
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

fn builder() -> Result<::config::ConfigBuilder<::config::builder::DefaultState>, ::config::ConfigError> {
    ::config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("server.cors_origins", "")?
        .set_default("albums.delete_policy", "detach")?
        .set_default("rate_limit.max_requests", 100)?
        .set_default("rate_limit.window_seconds", 60)?
        .set_default("rate_limit.ban_threshold", 3)?
        .set_default("rate_limit.ban_seconds", 3600)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origins: String::new(),
            },
            albums: AlbumsConfig {
                delete_policy: DeletePolicy::Detach,
            },
            rate_limit: RateLimitConfig {
                max_requests: 100,
                window_seconds: 60,
                ban_threshold: 3,
                ban_seconds: 3600,
            },
            analytics: AnalyticsConfig::default(),
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();

    let cfg = builder()?
        .add_source(
            ::config::Environment::with_prefix("GALLERY")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("invalid server.port: {}", cfg.server.port);
    }
    if cfg.rate_limit.max_requests == 0 || cfg.rate_limit.window_seconds == 0 {
        anyhow::bail!("rate_limit.max_requests and rate_limit.window_seconds must be > 0");
    }
    if cfg.rate_limit.ban_threshold == 0 {
        anyhow::bail!("rate_limit.ban_threshold must be > 0");
    }
    Ok(())
}
