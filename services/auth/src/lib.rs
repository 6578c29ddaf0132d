//! Authentication building blocks for the gallery API
//!
//! Token signing and verification, password hashing, request rate
//! limiting and input validation. The HTTP wiring lives in the `api`
//! service; this crate has no web framework dependency.

pub mod jwt;
pub mod password;
pub mod rate_limiter;
pub mod validation;

pub use jwt::{Claims, JwtConfig, JwtService};
pub use password::{PasswordError, generate_password, hash_password, verify_password};
pub use rate_limiter::{Decision, RateLimiter, RateLimiterConfig};
