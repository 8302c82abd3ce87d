//! Chat message entity and the message store trait.
//!
//! Maps to the `chat_messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A persisted chat message.
///
/// Maps to the `chat_messages` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - content: TEXT NOT NULL (never empty)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - reply_to_id: BIGINT NULL REFERENCES chat_messages(id)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Messages are append-only: the chat subsystem never updates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned, monotonically increasing identifier
    pub id: i64,

    /// Message text
    pub content: String,

    /// Author user ID
    pub user_id: i64,

    /// Message this one replies to, if the target existed at creation time
    pub reply_to_id: Option<i64>,

    /// Server-assigned creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
}

/// A message about to be persisted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub content: String,
    pub user_id: i64,
    pub reply_to_id: Option<i64>,
}

/// The message store: sole durable state of the chat subsystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Persist a new message and return it with its assigned ID and timestamp.
    async fn persist(&self, message: &NewChatMessage) -> Result<ChatMessage, AppError>;

    /// The `limit` most recent messages, newest first.
    async fn find_recent(&self, limit: i64) -> Result<Vec<ChatMessage>, AppError>;

    /// Find a message by ID. Returns None if it does not exist.
    async fn find_by_id(&self, id: i64) -> Result<Option<ChatMessage>, AppError>;
}
