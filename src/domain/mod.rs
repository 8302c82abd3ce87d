//! # Domain Layer
//!
//! The domain layer contains the entities of the chat subsystem and the
//! data access contracts it depends on. It has no dependencies on the
//! infrastructure or presentation layers.

pub mod entities;

// Re-export commonly used types
pub use entities::*;
