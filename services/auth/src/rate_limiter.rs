//! Fixed-window rate limiter with temporary bans
//!
//! Each key gets `max_requests` per window. A key refused
//! `ban_threshold` times in a row is banned for `ban_duration`; any
//! allowed request resets the refusal streak.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests allowed per window
    pub max_requests: u32,
    pub window: Duration,
    /// Consecutive refusals before a ban
    pub ban_threshold: u32,
    pub ban_duration: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            ban_threshold: 3,
            ban_duration: Duration::from_secs(3600),
        }
    }
}

impl RateLimiterConfig {
    /// `max_requests` per `window`, keeping the default ban policy
    pub fn per(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Self::default()
        }
    }
}

/// Outcome of [`RateLimiter::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    /// Over the limit for the current window
    Limited { retry_after: Duration },
    Banned { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// How long the caller should wait, when refused
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Decision::Allowed { .. } => None,
            Decision::Limited { retry_after } | Decision::Banned { retry_after } => {
                Some(*retry_after)
            }
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    /// Requests counted in the current window
    count: u32,
    window_start: Instant,
    /// Consecutive refusals
    refusals: u32,
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            refusals: 0,
            ban_expires: None,
        }
    }
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request for `key` and decide whether it may proceed
    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimiterEntry::new(now));

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return Decision::Banned {
                    retry_after: ban_expires - now,
                };
            }
            *entry = RateLimiterEntry::new(now);
        }

        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.config.max_requests {
            entry.refusals += 1;
            if entry.refusals >= self.config.ban_threshold {
                entry.ban_expires = Some(now + self.config.ban_duration);
                info!(
                    "Banned key {} for {} seconds",
                    key,
                    self.config.ban_duration.as_secs()
                );
                return Decision::Banned {
                    retry_after: self.config.ban_duration,
                };
            }

            debug!("Rate limited key {}", key);
            return Decision::Limited {
                retry_after: (entry.window_start + self.config.window) - now,
            };
        }

        entry.count += 1;
        entry.refusals = 0;
        Decision::Allowed {
            remaining: self.config.max_requests - entry.count,
        }
    }

    /// Drop entries whose window has passed and that carry no ban
    pub async fn purge_expired(&self) {
        self.purge_expired_at(Instant::now()).await
    }

    async fn purge_expired_at(&self, now: Instant) {
        let mut entries = self.entries.lock().await;
        let window = self.config.window;
        entries.retain(|_, entry| match entry.ban_expires {
            Some(ban_expires) => now < ban_expires,
            None => now.duration_since(entry.window_start) < window,
        });
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_requests,
            window: Duration::from_secs(10),
            ban_threshold: 3,
            ban_duration: Duration::from_secs(100),
        })
    }

    #[tokio::test]
    async fn test_allows_up_to_limit_then_refuses() {
        let limiter = limiter(2);
        let now = Instant::now();

        assert_eq!(
            limiter.check_at("a", now).await,
            Decision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check_at("a", now).await,
            Decision::Allowed { remaining: 0 }
        );
        let refused = limiter.check_at("a", now + Duration::from_secs(4)).await;
        assert_eq!(
            refused,
            Decision::Limited {
                retry_after: Duration::from_secs(6)
            }
        );

        // other keys are independent
        assert!(limiter.check_at("b", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_window_resets_count() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.is_allowed());
        assert!(!limiter.check_at("a", now).await.is_allowed());
        assert!(
            limiter
                .check_at("a", now + Duration::from_secs(10))
                .await
                .is_allowed()
        );
    }

    #[tokio::test]
    async fn test_repeated_refusals_ban_the_key() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.is_allowed());
        assert!(matches!(
            limiter.check_at("a", now).await,
            Decision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check_at("a", now).await,
            Decision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check_at("a", now).await,
            Decision::Banned { .. }
        ));

        // a fresh window does not lift the ban
        let later = now + Duration::from_secs(50);
        assert_eq!(
            limiter.check_at("a", later).await,
            Decision::Banned {
                retry_after: Duration::from_secs(50)
            }
        );

        let after_ban = now + Duration::from_secs(100);
        assert!(limiter.check_at("a", after_ban).await.is_allowed());
    }

    #[tokio::test]
    async fn test_purge_keeps_active_entries() {
        let limiter = limiter(1);
        let now = Instant::now();
        limiter.check_at("idle", now).await;
        for _ in 0..4 {
            limiter.check_at("banned", now).await;
        }

        limiter.purge_expired_at(now + Duration::from_secs(20)).await;
        let entries = limiter.entries.lock().await;
        assert!(!entries.contains_key("idle"));
        assert!(entries.contains_key("banned"));
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(Decision::Allowed { remaining: 3 }.retry_after(), None);
        let wait = Duration::from_secs(5);
        assert_eq!(Decision::Limited { retry_after: wait }.retry_after(), Some(wait));
    }
}
