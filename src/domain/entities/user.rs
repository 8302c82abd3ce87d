//! User role and the read-only user directory trait.
//!
//! Maps to the `users` table owned by the forum's account handlers. The chat
//! subsystem only ever reads it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// User role as issued in the forum's tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Convert from database / token string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only lookup from user ID to display name.
///
/// Names are resolved on every call; a rename is visible to the next lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Display name for `user_id`, or None if no such user exists.
    async fn display_name(&self, user_id: i64) -> Result<Option<String>, AppError>;

    /// Display names for several users in one lookup. Unknown ids are absent
    /// from the map.
    async fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>, AppError>;
}
