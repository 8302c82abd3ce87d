//! Repository Implementations
//!
//! PostgreSQL implementations of the domain data access traits.
//!
//! - **PgChatMessageRepository** - the append-only message store
//! - **PgUserDirectory** - read-only username lookup
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use forum_chat::infrastructure::repositories::{PgChatMessageRepository, PgUserDirectory};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let messages = PgChatMessageRepository::new(pool.clone());
//!     let users = PgUserDirectory::new(pool);
//! }
//! ```

pub mod chat_message_repository;
pub mod user_repository;

pub use chat_message_repository::PgChatMessageRepository;
pub use user_repository::PgUserDirectory;
