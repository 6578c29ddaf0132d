//! JWT service for token generation and validation
//!
//! Tokens are signed with HS256 using a single process-wide secret. The
//! subject is the user id; the role travels along for logging only, the
//! guard always reloads the user.

use anyhow::{Context, Result};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use common::models::{Role, User};

/// Default token lifetime: 3 hours
pub const DEFAULT_TOKEN_EXPIRY: u64 = 3 * 60 * 60;
/// Default `iss` claim
pub const DEFAULT_ISSUER: &str = "gallery";

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared signing secret
    pub secret: String,
    /// Token lifetime in seconds
    pub token_expiry: u64,
    /// Value of the `iss` claim, checked on verification
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_expiry: DEFAULT_TOKEN_EXPIRY,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `AUTH_SECRET`: signing secret (required, non-empty)
    /// - `AUTH_TOKEN_EXPIRY`: token lifetime in seconds (default: 10800)
    /// - `AUTH_ISSUER`: issuer claim (default: `gallery`)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("AUTH_SECRET")
            .context("AUTH_SECRET environment variable not set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("AUTH_SECRET must not be empty");
        }

        let token_expiry = std::env::var("AUTH_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRY);

        let issuer = std::env::var("AUTH_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        Ok(JwtConfig {
            secret,
            token_expiry,
            issuer,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    pub iss: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("Failed to get current time")?
        .as_secs())
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Issue a token for a user
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = unix_now()?;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + self.config.token_expiry,
            iss: self.config.issuer.clone(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .context("Failed to sign token")
    }

    /// Check signature, expiry and issuer, and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Token lifetime in seconds
    pub fn token_expiry(&self) -> u64 {
        self.config.token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::models::NewUser;
    use serial_test::serial;

    fn user() -> User {
        NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Role::Admin,
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
        }
        .into_records(Uuid::new_v4(), Utc::now())
        .0
    }

    #[test]
    fn test_issue_then_verify_resolves_subject() {
        let service = JwtService::new(JwtConfig::new("test-secret"));
        let user = user();

        let token = service.issue(&user).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_EXPIRY);
    }

    #[test]
    fn test_rejects_foreign_secret_and_issuer() {
        let service = JwtService::new(JwtConfig::new("test-secret"));
        let token = service.issue(&user()).unwrap();

        let other_secret = JwtService::new(JwtConfig::new("another-secret"));
        assert!(other_secret.verify(&token).is_err());

        let mut config = JwtConfig::new("test-secret");
        config.issuer = "someone-else".to_string();
        assert!(JwtService::new(config).verify(&token).is_err());

        assert!(service.verify("not-a-token").is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let service = JwtService::new(JwtConfig::new("test-secret"));
        let now = unix_now().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            iat: now - 100,
            exp: now - 10,
            iss: DEFAULT_ISSUER.to_string(),
        };
        let token = service.sign(&claims).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::remove_var("AUTH_SECRET");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("AUTH_SECRET", "from-env");
            std::env::set_var("AUTH_TOKEN_EXPIRY", "60");
            std::env::remove_var("AUTH_ISSUER");
        }
        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.secret, "from-env");
        assert_eq!(config.token_expiry, 60);
        assert_eq!(config.issuer, DEFAULT_ISSUER);
        assert!(!format!("{:?}", config).contains("from-env"));

        unsafe {
            std::env::remove_var("AUTH_SECRET");
            std::env::remove_var("AUTH_TOKEN_EXPIRY");
        }
    }
}
