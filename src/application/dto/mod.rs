//! Data Transfer Objects
//!
//! Payloads crossing the chat stream.

pub mod request;
pub mod response;

pub use request::ChatMessageRequest;
pub use response::{DecoratedMessage, ReplySummary, UserSummary};
