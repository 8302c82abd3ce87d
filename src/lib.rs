//! # Forum Chat Library
//!
//! The real-time chat subsystem of the forum:
//! - authenticated WebSocket sessions at `GET /ws/chat`
//! - history replay for newcomers
//! - persisted, reply-threaded messages fanned out to every participant
//! - PostgreSQL for persistent storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Chat entities and data access traits
//! - **Application Layer**: Chat and token services, wire DTOs
//! - **Infrastructure Layer**: Database pool, repositories and metrics
//! - **Presentation Layer**: HTTP routes, middleware and the WebSocket hub
//!
//! ## Module Structure
//!
//! ```text
//! forum_chat/
//! +-- config/         Configuration management
//! +-- domain/         Entities and repository traits
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Database, repositories and metrics
//! +-- presentation/   HTTP routes, middleware and WebSocket sessions
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
