//! Presentation Layer
//!
//! HTTP routes, middleware and the WebSocket chat sessions.

pub mod http;
pub mod middleware;
pub mod websocket;
