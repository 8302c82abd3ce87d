//! Response DTOs
//!
//! The outbound wire representation of chat messages. Never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;

/// Message author as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    /// Omitted when the directory lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Compact view of the message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySummary {
    pub id: i64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A chat message enriched for the wire:
/// `{id, content, user: {id, username}, created_at, reply_to?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedMessage {
    pub id: i64,
    pub content: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplySummary>,
}

impl DecoratedMessage {
    pub fn new(
        message: ChatMessage,
        username: Option<String>,
        reply_to: Option<ReplySummary>,
    ) -> Self {
        Self {
            id: message.id,
            content: message.content,
            user: UserSummary {
                id: message.user_id,
                username,
            },
            created_at: message.created_at,
            reply_to,
        }
    }
}
