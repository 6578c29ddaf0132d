//! Password hashing
//!
//! Argon2id digests in PHC string format. Hashing is CPU bound, so both
//! directions run on the blocking pool.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tokio::task;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Password task failed: {0}")]
    Task(#[from] task::JoinError),
}

/// Hash a plaintext password
pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    })
    .await?
}

/// Check a plaintext password against a stored digest.
///
/// A digest that cannot be parsed never matches.
pub async fn verify_password(password: String, digest: String) -> Result<bool, PasswordError> {
    let matches = task::spawn_blocking(move || match PasswordHash::new(&digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password digest is malformed: {}", e);
            false
        }
    })
    .await?;

    Ok(matches)
}

/// Random alphanumeric password
pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let digest = hash_password("correct horse".to_string()).await.unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify_password("correct horse".to_string(), digest.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".to_string(), digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_digest_never_matches() {
        assert!(!verify_password("anything".to_string(), "plaintext".to_string())
            .await
            .unwrap());
    }

    #[test]
    fn test_generate_password() {
        let password = generate_password(16);
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password(16));
    }
}
