//! HTTP Handlers
//!
//! Request handlers for the plain HTTP endpoints.

pub mod health;
