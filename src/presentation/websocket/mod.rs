//! WebSocket Chat
//!
//! Real-time chat over WebSocket connections: one session per connection,
//! a shared connection registry and a single broadcaster.

pub mod broadcaster;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod registry;
pub mod session;

pub use broadcaster::Broadcaster;
pub use handler::ws_handler;
pub use hub::{ChatHub, SessionGuard};
pub use messages::{CloseCause, OutboundFrame};
pub use registry::{
    ConnectionEntry, ConnectionId, ConnectionInfo, ConnectionRegistry, Eviction, EvictionReason,
};
pub use session::{SessionPhase, SessionState};
