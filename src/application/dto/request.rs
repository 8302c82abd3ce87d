//! Request DTOs
//!
//! Inbound payloads accepted over the chat stream.

use serde::Deserialize;
use validator::Validate;

use crate::shared::validation::{describe, not_blank};

/// A chat message as sent by a client: `{content, reply_to_id?}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct ChatMessageRequest {
    #[validate(custom(function = "not_blank"))]
    pub content: String,

    #[serde(default)]
    #[validate(range(min = 1, message = "reply_to_id must be a positive message ID"))]
    pub reply_to_id: Option<i64>,
}

impl ChatMessageRequest {
    /// Decode and validate one text frame.
    ///
    /// Returns a description of the problem when the frame is not a usable
    /// chat message.
    pub fn parse(text: &str, max_content_length: usize) -> Result<Self, String> {
        let request: Self =
            serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;

        request.validate().map_err(|e| describe(&e))?;

        let length = request.content.chars().count();
        if length > max_content_length {
            return Err(format!(
                "content: must be at most {} characters (got {})",
                max_content_length, length
            ));
        }

        Ok(request)
    }
}
