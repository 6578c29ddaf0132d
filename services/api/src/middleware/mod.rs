//! Request middleware: the auth guard, rate limiting and security headers

pub mod auth;
pub mod rate_limit;
pub mod security_headers;

pub use self::auth::{CurrentUser, auth_middleware};
pub use self::rate_limit::{RateLimit, rate_limit_middleware};
pub use self::security_headers::security_headers_middleware;
