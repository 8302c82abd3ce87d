//! Chat Message Repository Implementation
//!
//! PostgreSQL implementation of the message store. Append-only: the chat
//! subsystem inserts and reads, never updates or deletes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{ChatMessage, ChatMessageRepository, NewChatMessage};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// PostgreSQL chat message repository.
#[derive(Clone)]
pub struct PgChatMessageRepository {
    pool: PgPool,
}

impl PgChatMessageRepository {
    /// Creates a new PgChatMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for chat message queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    content: String,
    user_id: i64,
    reply_to_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl ChatMessageRow {
    fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            content: self.content,
            user_id: self.user_id,
            reply_to_id: self.reply_to_id,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl ChatMessageRepository for PgChatMessageRepository {
    /// Insert a message; the database assigns `id` and `created_at`.
    async fn persist(&self, message: &NewChatMessage) -> Result<ChatMessage, AppError> {
        let timer = metrics::DbTimer::start("insert", "chat_messages");
        let row = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            INSERT INTO chat_messages (content, user_id, reply_to_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, user_id, reply_to_id, created_at
            "#,
        )
        .bind(&message.content)
        .bind(message.user_id)
        .bind(message.reply_to_id)
        .fetch_one(&self.pool)
        .await?;
        timer.finish();

        Ok(row.into_message())
    }

    /// Most recent messages, newest first.
    ///
    /// `id` breaks ties between messages created in the same instant.
    async fn find_recent(&self, limit: i64) -> Result<Vec<ChatMessage>, AppError> {
        let timer = metrics::DbTimer::start("select_recent", "chat_messages");
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT id, content, user_id, reply_to_id, created_at
            FROM chat_messages
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        timer.finish();

        Ok(rows.into_iter().map(|r| r.into_message()).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ChatMessage>, AppError> {
        let timer = metrics::DbTimer::start("select_by_id", "chat_messages");
        let row = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT id, content, user_id, reply_to_id, created_at
            FROM chat_messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        timer.finish();

        Ok(row.map(|r| r.into_message()))
    }
}
