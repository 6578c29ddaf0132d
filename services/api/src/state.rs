//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use auth::{JwtService, RateLimiter, RateLimiterConfig};
use common::Stores;

use crate::analytics::AnalyticsProvider;
use crate::config::{AppConfig, DeletePolicy};

/// Rate limiters shared by every request
#[derive(Debug, Clone)]
pub struct Limits {
    /// Applied to every route
    pub global: RateLimiter,
    /// `GET /files/random`
    pub random_files: RateLimiter,
    /// `POST /users` and `GET /users/@me`
    pub user_requests: RateLimiter,
}

impl Limits {
    pub fn new(global: RateLimiterConfig) -> Self {
        Self {
            global: RateLimiter::new(global),
            random_files: RateLimiter::new(RateLimiterConfig::per(15, Duration::from_secs(15))),
            user_requests: RateLimiter::new(RateLimiterConfig::per(5, Duration::from_secs(1))),
        }
    }

    pub async fn purge_expired(&self) {
        self.global.purge_expired().await;
        self.random_files.purge_expired().await;
        self.user_requests.purge_expired().await;
    }

    /// Drop idle limiter entries every `every` until the task is aborted
    pub fn spawn_purge(&self, every: Duration) -> JoinHandle<()> {
        let limits = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limits.purge_expired().await;
            }
        })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub jwt: Arc<JwtService>,
    pub limits: Limits,
    pub analytics: Arc<dyn AnalyticsProvider>,
    pub delete_policy: DeletePolicy,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        stores: Stores,
        jwt: JwtService,
        analytics: Arc<dyn AnalyticsProvider>,
    ) -> Self {
        Self {
            stores,
            jwt: Arc::new(jwt),
            limits: Limits::new(config.rate_limit.limiter()),
            analytics,
            delete_policy: config.albums.delete_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_task_stops_when_aborted() {
        let limits = Limits::new(RateLimiterConfig::per(1, Duration::from_millis(5)));
        assert!(limits.global.check("ip:127.0.0.1").await.is_allowed());

        let purge = limits.spawn_purge(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!purge.is_finished());

        purge.abort();
        let err = purge.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
