//! Rate limiting middleware
//!
//! Callers are keyed by the subject of a valid bearer token when one is
//! present, otherwise by client address.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use auth::{Decision, JwtService, RateLimiter};

use crate::error::ApiError;

/// Middleware state: one limiter and the token service used to key callers
#[derive(Clone)]
pub struct RateLimit {
    pub limiter: RateLimiter,
    pub jwt: Arc<JwtService>,
}

impl RateLimit {
    pub fn new(limiter: RateLimiter, jwt: Arc<JwtService>) -> Self {
        Self { limiter, jwt }
    }
}

/// First hop of `X-Forwarded-For`, then the socket peer
pub fn client_ip(headers: &HeaderMap, fallback: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or(fallback)
}

/// Identity a request is counted against
pub fn client_key(jwt: &JwtService, headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(bearer) = headers.typed_get::<Authorization<Bearer>>() {
        if let Ok(claims) = jwt.verify(bearer.token()) {
            return format!("user:{}", claims.sub);
        }
    }

    match client_ip(headers, peer) {
        Some(ip) => format!("ip:{}", ip),
        None => "unknown".to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimit>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let key = client_key(&rate_limit.jwt, req.headers(), peer);

    match rate_limit.limiter.check(&key).await {
        Decision::Allowed { .. } => Ok(next.run(req).await),
        refused => {
            let retry_after = refused
                .retry_after()
                .map(|wait| wait.as_secs().max(1))
                .unwrap_or(1);
            Err(ApiError::RateLimited { retry_after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::JwtConfig;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use common::models::{NewUser, Role};
    use uuid::Uuid;

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig::new("rate-limit-secret"))
    }

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer = Some(IpAddr::from([127, 0, 0, 1]));
        assert_eq!(
            client_ip(&headers, peer),
            Some(IpAddr::from([203, 0, 113, 7]))
        );
        assert_eq!(client_ip(&HeaderMap::new(), peer), peer);
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_valid_token_keys_by_subject() {
        let jwt = jwt();
        let (user, _) = NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Role::User,
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
        }
        .into_records(Uuid::new_v4(), Utc::now());
        let token = jwt.issue(&user).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(client_key(&jwt, &headers, None), format!("user:{}", user.id));

        headers.insert("authorization", HeaderValue::from_static("Bearer forged"));
        let peer = Some(IpAddr::from([192, 0, 2, 1]));
        assert_eq!(client_key(&jwt, &headers, peer), "ip:192.0.2.1");
        assert_eq!(client_key(&jwt, &HeaderMap::new(), None), "unknown");
    }
}
