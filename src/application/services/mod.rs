//! Application Services
//!
//! - **ChatService** - persistence, reply resolution and decoration of chat messages
//! - **TokenVerifier** - verification of the forum's bearer tokens

pub mod auth_service;
pub mod chat_service;

pub use auth_service::{AuthError, AuthenticatedUser, Claims, TokenVerifier};
pub use chat_service::{ChatError, ChatService};
