//! # Domain Entities
//!
//! Core domain entities of the chat subsystem.
//!
//! - **ChatMessage**: a persisted chat message, optionally replying to another
//! - **UserRole**: the role carried by a verified identity
//!
//! Each entity has an associated data access trait. The traits are implemented
//! in the infrastructure layer, following the dependency inversion principle.

mod chat_message;
mod user;

pub use chat_message::{ChatMessage, ChatMessageRepository, NewChatMessage};
pub use user::{UserDirectory, UserRole};

#[cfg(test)]
pub use chat_message::MockChatMessageRepository;
#[cfg(test)]
pub use user::MockUserDirectory;
