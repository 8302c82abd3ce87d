//! Chat Service
//!
//! Persists inbound chat messages, resolves reply targets and decorates
//! messages with author names for the wire.
//!
//! Failure policy:
//! - a failed write drops that one message (the store error is returned);
//! - a failed or empty reply lookup stores the message without the reply
//!   relation, so the primary message is never lost to decoration;
//! - a failed name lookup omits the username instead of dropping the message.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::dto::{ChatMessageRequest, DecoratedMessage, ReplySummary};
use crate::config::ChatSettings;
use crate::domain::{ChatMessage, ChatMessageRepository, NewChatMessage, UserDirectory};
use crate::shared::error::AppError;

/// An inbound frame that is not a usable chat message
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Message store + user directory glue for chat sessions
pub struct ChatService {
    messages: Arc<dyn ChatMessageRepository>,
    users: Arc<dyn UserDirectory>,
    history_limit: i64,
    max_content_length: usize,
}

impl ChatService {
    pub fn new(
        messages: Arc<dyn ChatMessageRepository>,
        users: Arc<dyn UserDirectory>,
        settings: &ChatSettings,
    ) -> Self {
        Self {
            messages,
            users,
            history_limit: settings.history_limit,
            max_content_length: settings.max_content_length,
        }
    }

    /// Decode one inbound text frame.
    pub fn parse(&self, text: &str) -> Result<ChatMessageRequest, ChatError> {
        ChatMessageRequest::parse(text, self.max_content_length)
            .map_err(ChatError::MalformedPayload)
    }

    /// Persist one inbound message from `author_id` and return it decorated.
    /// Only the write itself can fail.
    pub async fn post(
        &self,
        author_id: i64,
        request: ChatMessageRequest,
    ) -> Result<DecoratedMessage, AppError> {
        let reply_target = match request.reply_to_id {
            Some(id) => self.resolve_reply_target(id).await,
            None => None,
        };

        let new_message = NewChatMessage {
            content: request.content,
            user_id: author_id,
            reply_to_id: reply_target.as_ref().map(|t| t.id),
        };

        let message = self.messages.persist(&new_message).await?;

        tracing::debug!(
            message_id = message.id,
            user_id = author_id,
            reply_to_id = ?message.reply_to_id,
            "Chat message persisted"
        );

        let username = self.display_name(message.user_id).await;
        let reply_to = match reply_target {
            Some(target) => Some(ReplySummary {
                id: target.id,
                username: self.display_name(target.user_id).await,
                content: target.content,
            }),
            None => None,
        };

        Ok(DecoratedMessage::new(message, username, reply_to))
    }

    /// The most recent messages, oldest first, decorated with current names.
    ///
    /// Reply targets inside the batch are taken from the batch; each author
    /// name is looked up once for the whole batch.
    pub async fn history(&self) -> Result<Vec<DecoratedMessage>, AppError> {
        if self.history_limit == 0 {
            return Ok(Vec::new());
        }

        let mut recent = self.messages.find_recent(self.history_limit).await?;
        recent.reverse();

        let mut targets: HashMap<i64, Option<ChatMessage>> = recent
            .iter()
            .map(|message| (message.id, Some(message.clone())))
            .collect();
        for id in recent.iter().filter_map(|message| message.reply_to_id) {
            if !targets.contains_key(&id) {
                let target = self.resolve_reply_target(id).await;
                targets.insert(id, target);
            }
        }

        let mut authors: Vec<i64> = recent.iter().map(|message| message.user_id).collect();
        authors.extend(
            recent
                .iter()
                .filter_map(|message| message.reply_to_id)
                .filter_map(|id| targets.get(&id).and_then(|t| t.as_ref()))
                .map(|target| target.user_id),
        );
        authors.sort_unstable();
        authors.dedup();
        let names = self.display_names(&authors).await;

        Ok(recent
            .into_iter()
            .map(|message| {
                let reply_to = message
                    .reply_to_id
                    .and_then(|id| targets.get(&id).and_then(|t| t.as_ref()))
                    .map(|target| ReplySummary {
                        id: target.id,
                        content: target.content.clone(),
                        username: names.get(&target.user_id).cloned(),
                    });
                let username = names.get(&message.user_id).cloned();
                DecoratedMessage::new(message, username, reply_to)
            })
            .collect())
    }

    /// Look up a reply target. Missing targets and lookup failures both yield
    /// None; the caller carries on without the relation.
    async fn resolve_reply_target(&self, id: i64) -> Option<ChatMessage> {
        match self.messages.find_by_id(id).await {
            Ok(Some(target)) => Some(target),
            Ok(None) => {
                tracing::debug!(reply_to_id = id, "Reply target does not exist");
                None
            }
            Err(e) => {
                tracing::warn!(reply_to_id = id, error = %e, "Reply target lookup failed");
                None
            }
        }
    }

    async fn display_name(&self, user_id: i64) -> Option<String> {
        match self.users.display_name(user_id).await {
            Ok(Some(name)) => Some(name),
            Ok(None) => {
                tracing::warn!(user_id = user_id, "Message author not found in user directory");
                None
            }
            Err(e) => {
                tracing::warn!(user_id = user_id, error = %e, "User directory lookup failed");
                None
            }
        }
    }

    async fn display_names(&self, user_ids: &[i64]) -> HashMap<i64, String> {
        match self.users.display_names(user_ids).await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(
                    users = user_ids.len(),
                    error = %e,
                    "User directory batch lookup failed"
                );
                HashMap::new()
            }
        }
    }
}
