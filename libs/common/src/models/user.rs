//! User model and related functionality
//!
//! A user is stored as two records sharing one id: the public metadata and
//! the credentials. [`User`] is the merged read shape and never carries the
//! password digest; only [`Credentials`] does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// User entity: metadata merged with the public part of the credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub avatar: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Secret half of a user record
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub id: Uuid,
    pub email: String,
    /// Password digest in PHC string format
    pub password: String,
    pub password_edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("password_edited_at", &self.password_edited_at)
            .finish()
    }
}

/// New user creation payload; the password must already be hashed
#[derive(Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Split into the two stored records
    pub fn into_records(self, id: Uuid, now: DateTime<Utc>) -> (User, Credentials) {
        let user = User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            avatar: String::new(),
            email: self.email.clone(),
            created_at: now,
            modified_at: now,
        };
        let credentials = Credentials {
            id,
            email: self.email,
            password: self.password_hash,
            password_edited_at: None,
            created_at: now,
            modified_at: now,
        };
        (user, credentials)
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_value(Role::User).unwrap(), "user");
    }

    #[test]
    fn test_debug_never_prints_digest() {
        let new_user = NewUser {
            first_name: "Ada".to_string(),
            last_name: "L".to_string(),
            role: Role::Admin,
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
        };
        assert!(!format!("{:?}", new_user).contains("argon2"));

        let (user, credentials) = new_user.into_records(Uuid::new_v4(), Utc::now());
        assert!(!format!("{:?}", credentials).contains("argon2"));
        assert!(serde_json::to_string(&user).unwrap().find("argon2").is_none());
        assert_eq!(user.id, credentials.id);
    }
}
