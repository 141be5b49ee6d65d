//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Unique identifier for a User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random UserId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A registered wallet owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A validated registration, ready to be persisted.
///
/// Only the hash of the API key is ever stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub api_key_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Validates registration fields.
    ///
    /// # Validation
    /// - Username must have at least 3 non-blank characters
    /// - Email must contain `@` with text on both sides
    pub fn new(username: &str, email: &str, api_key_hash: String) -> Result<Self, DomainError> {
        let username = username.trim();
        if username.chars().count() < 3 {
            return Err(DomainError::ValidationError(
                "Username must be at least 3 characters".into(),
            ));
        }

        let email = email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(DomainError::ValidationError(
                    "Email address is not valid".into(),
                ));
            }
        }

        Ok(Self {
            id: UserId::new(),
            username: username.to_string(),
            email: email.to_string(),
            api_key_hash,
            created_at: Utc::now(),
        })
    }

    /// The public view of the user once persisted.
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_trims_fields() {
        let user = NewUser::new("  alice ", " alice@example.com ", "hash".into()).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.to_user().id, user.id);
    }

    #[test]
    fn test_short_username_fails() {
        let result = NewUser::new("al", "al@example.com", "hash".into());
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_email_fails() {
        for email in ["", "alice", "@example.com", "alice@"] {
            let result = NewUser::new("alice", email, "hash".into());
            assert!(
                matches!(result, Err(DomainError::ValidationError(_))),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
